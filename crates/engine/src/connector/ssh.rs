// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector for a workload manager on a remote host, reached over a
//! persistent secure-shell connection.
//!
//! The ssh2 transport is blocking; every call runs under
//! `spawn_blocking`. Any transport error clears the session so the next
//! call reconnects.

use super::QueueConnector;
use crate::error::EngineError;
use crate::script::{self, SolverPaths};
use async_trait::async_trait;
use parking_lot::Mutex;
use qc_core::{JobId, RemoteJob, RemoteStatus};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

fn qsub_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| match regex::Regex::new(r"^(\d+)\.[\w.]+") {
        Ok(re) => re,
        Err(_) => unreachable!("pattern fixed at compile time"),
    })
}

fn qstat_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = concat!(
            r"^(?P<id>\d+)\.\S+\s+",
            r"\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+",
            r"(?P<st>\w)\s",
        );
        match regex::Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => unreachable!("pattern fixed at compile time"),
        }
    })
}

/// Parse the scheduler id out of qsub stdout (`4217.headnode.example`).
pub fn parse_qsub_output(output: &str) -> Option<String> {
    qsub_re()
        .captures(output.trim_start())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse `qstat -u {user}` output into (id, status letter) pairs.
pub fn parse_qstat_output(output: &str) -> Vec<(String, char)> {
    output
        .lines()
        .filter_map(|line| {
            let caps = qstat_re().captures(line)?;
            let id = caps.name("id")?.as_str().to_string();
            let status = caps.name("st")?.as_str().chars().next()?;
            Some((id, status))
        })
        .collect()
}

/// Map a scheduler status letter to a remote status. `E` (exiting) is
/// still running: completion is recognised only when the job leaves the
/// queue listing.
pub fn map_remote_state(state: char) -> RemoteStatus {
    match state {
        'Q' => RemoteStatus::Queued,
        'R' | 'E' => RemoteStatus::Running,
        'C' => RemoteStatus::Done,
        _ => RemoteStatus::Unknown,
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub key_file: PathBuf,
    /// Scheduler queue to submit into.
    pub queue: String,
    pub walltime_secs: u64,
    pub maxjobs: usize,
    /// Directory under the remote home holding per-job workdirs.
    #[serde(default = "default_remote_root")]
    pub remote_root: String,
    #[serde(default)]
    pub solver: SolverPaths,
}

fn default_remote_root() -> String {
    "qcjobs".to_string()
}

struct SshTransport {
    config: SshConfig,
    session: Option<ssh2::Session>,
}

fn transport_err(error: impl std::fmt::Display) -> EngineError {
    EngineError::Transport(error.to_string())
}

impl SshTransport {
    fn new(config: SshConfig) -> Self {
        Self { config, session: None }
    }

    fn reset(&mut self) {
        self.session = None;
    }

    fn session(&mut self) -> Result<&ssh2::Session, EngineError> {
        if self.session.is_none() {
            let addr = format!("{}:{}", self.config.host, self.config.port);
            tracing::info!(addr, user = self.config.username, "establishing ssh connection");
            let tcp = std::net::TcpStream::connect(&addr).map_err(transport_err)?;
            let mut session = ssh2::Session::new().map_err(transport_err)?;
            session.set_tcp_stream(tcp);
            session.handshake().map_err(transport_err)?;
            session
                .userauth_pubkey_file(&self.config.username, None, &self.config.key_file, None)
                .map_err(transport_err)?;
            self.session = Some(session);
        }
        match &self.session {
            Some(session) => Ok(session),
            None => unreachable!("session established above"),
        }
    }

    fn exec(&mut self, command: &str) -> Result<String, EngineError> {
        let result = (|| {
            let session = self.session()?;
            let mut channel = session.channel_session().map_err(transport_err)?;
            channel.exec(command).map_err(transport_err)?;
            let mut stdout = String::new();
            channel.read_to_string(&mut stdout).map_err(transport_err)?;
            let _ = channel.wait_close();
            Ok(stdout)
        })();
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn upload(&mut self, remote: &Path, data: &[u8]) -> Result<(), EngineError> {
        let result = (|| {
            let session = self.session()?;
            let sftp = session.sftp().map_err(transport_err)?;
            let mut file = sftp.create(remote).map_err(transport_err)?;
            file.write_all(data).map_err(transport_err)?;
            Ok(())
        })();
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn list_dir(&mut self, remote: &Path) -> Result<Vec<String>, EngineError> {
        let result = (|| {
            let session = self.session()?;
            let sftp = session.sftp().map_err(transport_err)?;
            let entries = sftp.readdir(remote).map_err(transport_err)?;
            Ok(entries
                .into_iter()
                .filter_map(|(path, _)| {
                    path.file_name().map(|n| n.to_string_lossy().into_owned())
                })
                .collect())
        })();
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn download(&mut self, remote: &Path, local: &Path) -> Result<(), EngineError> {
        let result = (|| {
            let session = self.session()?;
            let sftp = session.sftp().map_err(transport_err)?;
            let mut file = sftp.open(remote).map_err(transport_err)?;
            let mut data = Vec::new();
            file.read_to_end(&mut data).map_err(transport_err)?;
            std::fs::write(local, data).map_err(transport_err)?;
            Ok(())
        })();
        if result.is_err() {
            self.reset();
        }
        result
    }
}

/// Remote-scheduler connector. The qstat snapshot, filtered to ids this
/// connector submitted or recovered, is the cached queue view.
pub struct SshConnector {
    config: SshConfig,
    transport: Arc<Mutex<SshTransport>>,
    queue_view: Vec<(String, char)>,
    known: HashSet<String>,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        let transport = Arc::new(Mutex::new(SshTransport::new(config.clone())));
        Self {
            config,
            transport,
            queue_view: Vec::new(),
            known: HashSet::new(),
        }
    }

    async fn with_transport<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SshTransport) -> Result<T, EngineError> + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || f(&mut transport.lock()))
            .await
            .map_err(|e| EngineError::Transport(format!("ssh worker: {e}")))?
    }
}

#[async_trait]
impl QueueConnector for SshConnector {
    async fn init(&mut self, jobs: Vec<RemoteJob>) -> Result<(), EngineError> {
        for job in jobs {
            self.known.insert(job.backend_id);
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<(), EngineError> {
        let user = self.config.username.clone();
        let entries = self
            .with_transport(move |t| {
                let stdout = t.exec(&format!("qstat -u {user}"))?;
                Ok(parse_qstat_output(&stdout))
            })
            .await?;
        self.queue_view = entries
            .into_iter()
            .filter(|(id, _)| self.known.contains(id))
            .collect();
        tracing::debug!(jobs = self.queue_view.len(), "refreshed remote queue view");
        Ok(())
    }

    async fn get_status(&mut self, job: &RemoteJob) -> Result<Option<RemoteStatus>, EngineError> {
        Ok(self
            .queue_view
            .iter()
            .find(|(id, _)| *id == job.backend_id)
            .map(|(_, state)| map_remote_state(*state)))
    }

    fn can_submit(&self) -> bool {
        self.queue_view.len() < self.config.maxjobs
    }

    async fn submit(&mut self, jobid: &JobId, workdir: &Path) -> Result<RemoteJob, EngineError> {
        let input = tokio::fs::read(workdir.join("input")).await?;
        let script = script::build_pbs_script(
            jobid,
            &self.config.queue,
            self.config.walltime_secs,
            &self.config.username,
            &self.config.solver,
        );
        let remote_dir = format!("{}/{}", self.config.remote_root, jobid);
        let id = jobid.clone();
        let dir = remote_dir.clone();
        let backend_id = self
            .with_transport(move |t| {
                t.exec(&format!("mkdir -p {dir}"))?;
                t.upload(Path::new(&format!("{dir}/{id}.pbs")), script.as_bytes())?;
                t.upload(Path::new(&format!("{dir}/input")), &input)?;
                let stdout = t.exec(&format!("cd {dir} && qsub {id}.pbs"))?;
                parse_qsub_output(&stdout).ok_or_else(|| {
                    EngineError::Submission(format!("qsub gave no job id: {}", stdout.trim()))
                })
            })
            .await?;
        tracing::info!(%jobid, backend_id, "submitted remote job");
        self.known.insert(backend_id.clone());
        Ok(RemoteJob {
            jobid: jobid.clone(),
            backend_id,
            local_dir: workdir.to_path_buf(),
            remote_dir: Some(PathBuf::from(remote_dir)),
        })
    }

    async fn terminate(&mut self, job: &RemoteJob) -> Result<(), EngineError> {
        let id = job.backend_id.clone();
        if let Err(error) = self
            .with_transport(move |t| t.exec(&format!("qdel {id}")).map(|_| ()))
            .await
        {
            tracing::warn!(backend_id = job.backend_id, %error, "remote cancel failed");
        }
        Ok(())
    }

    async fn transfer_output(&mut self, job: &RemoteJob) -> Result<Vec<String>, EngineError> {
        let Some(remote_dir) = job.remote_dir.clone() else {
            return Ok(Vec::new());
        };
        let local_dir = job.local_dir.clone();
        let script_name = format!("{}.pbs", job.jobid);
        let artefact_prefix = format!("qc_{}", job.jobid);
        self.with_transport(move |t| {
            let mut transferred = Vec::new();
            for name in t.list_dir(&remote_dir)? {
                if name == "input" || name == script_name || name.starts_with(&artefact_prefix) {
                    continue;
                }
                t.download(&remote_dir.join(&name), &local_dir.join(&name))?;
                transferred.push(name);
            }
            Ok(transferred)
        })
        .await
        .map_err(|error| match error {
            EngineError::Transport(message) => EngineError::Transfer(message),
            other => other,
        })
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;

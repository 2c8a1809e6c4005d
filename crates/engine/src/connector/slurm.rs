// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector for a workload manager whose client lives on this host.
//!
//! Shells out to `sbatch`/`squeue`/`scancel`. [`SlurmClient`] is the
//! raw command surface; the job manager uses it directly for the
//! synchronous directive path, the monitor drives it through
//! [`SlurmConnector`].

use super::QueueConnector;
use crate::error::EngineError;
use crate::script::{self, SolverPaths};
use async_trait::async_trait;
use qc_core::{JobId, RemoteJob, RemoteStatus};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::process::Command;

fn sbatch_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| match regex::Regex::new(r"Submitted batch job (\d+)") {
        Ok(re) => re,
        Err(_) => unreachable!("pattern fixed at compile time"),
    })
}

/// Parse the scheduler id out of sbatch stdout.
pub fn parse_sbatch_output(output: &str) -> Option<String> {
    sbatch_re()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// One `squeue -h` line: `JOBID PARTITION NAME USER ST TIME NODES …`.
/// Returns the id and the status column.
pub fn parse_squeue_line(line: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() > 4 {
        Some((tokens[0].to_string(), tokens[4].to_string()))
    } else {
        None
    }
}

/// Map a squeue status column to a remote status.
pub fn squeue_state(state: &str) -> RemoteStatus {
    match state {
        "R" | "CG" => RemoteStatus::Running,
        _ => RemoteStatus::Queued,
    }
}

/// Raw command surface over the scheduler client binaries.
#[derive(Clone)]
pub struct SlurmClient {
    bin_dir: PathBuf,
    user: String,
}

impl SlurmClient {
    pub fn new(bin_dir: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self { bin_dir: bin_dir.into(), user: user.into() }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<String, EngineError> {
        let exe = self.bin_dir.join(program);
        let output = Command::new(&exe)
            .args(args)
            .output()
            .await
            .map_err(|e| EngineError::Transport(format!("{}: {e}", exe.display())))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Submit a script; parse the assigned id from
    /// `Submitted batch job N`.
    pub async fn submit_script(&self, script: &Path) -> Result<String, EngineError> {
        let path = script.display().to_string();
        let stdout = self.run("sbatch", &[path.as_str()]).await?;
        parse_sbatch_output(&stdout).ok_or_else(|| {
            EngineError::Submission(format!("sbatch gave no job id: {}", stdout.trim()))
        })
    }

    /// Status column for one job; `None` when squeue no longer lists it.
    pub async fn job_state(&self, backend_id: &str) -> Result<Option<String>, EngineError> {
        let stdout = self.run("squeue", &["-h", "--job", backend_id]).await?;
        Ok(parse_squeue_line(&stdout).map(|(_, state)| state))
    }

    /// All of this user's queued and running jobs.
    pub async fn queue_snapshot(&self) -> Result<Vec<(String, String)>, EngineError> {
        let stdout = self.run("squeue", &["-h", "-u", &self.user]).await?;
        Ok(stdout.lines().filter_map(parse_squeue_line).collect())
    }

    pub async fn cancel(&self, backend_id: &str) -> Result<(), EngineError> {
        self.run("scancel", &[backend_id]).await?;
        Ok(())
    }
}

/// Monitor-facing connector over [`SlurmClient`]. The squeue snapshot
/// is the cached view; a job absent from it after submission is done.
pub struct SlurmConnector {
    client: SlurmClient,
    solver: SolverPaths,
    maxjobs: usize,
    snapshot: Vec<(String, String)>,
}

impl SlurmConnector {
    pub fn new(client: SlurmClient, solver: SolverPaths, maxjobs: usize) -> Self {
        Self { client, solver, maxjobs, snapshot: Vec::new() }
    }
}

#[async_trait]
impl QueueConnector for SlurmConnector {
    async fn init(&mut self, _jobs: Vec<RemoteJob>) -> Result<(), EngineError> {
        // The scheduler queue is authoritative; nothing to rebuild.
        Ok(())
    }

    async fn update(&mut self) -> Result<(), EngineError> {
        self.snapshot = self.client.queue_snapshot().await?;
        Ok(())
    }

    async fn get_status(&mut self, job: &RemoteJob) -> Result<Option<RemoteStatus>, EngineError> {
        Ok(self
            .snapshot
            .iter()
            .find(|(id, _)| *id == job.backend_id)
            .map(|(_, state)| squeue_state(state)))
    }

    fn can_submit(&self) -> bool {
        self.snapshot.len() < self.maxjobs
    }

    async fn submit(&mut self, jobid: &JobId, workdir: &Path) -> Result<RemoteJob, EngineError> {
        let script_path = workdir.join("batch");
        let script = script::build_slurm_script(jobid, workdir, &self.solver);
        tokio::fs::write(&script_path, script).await?;
        let backend_id = self.client.submit_script(&script_path).await?;
        tracing::info!(%jobid, backend_id, "submitted batch job");
        Ok(RemoteJob {
            jobid: jobid.clone(),
            backend_id,
            local_dir: workdir.to_path_buf(),
            remote_dir: None,
        })
    }

    async fn terminate(&mut self, job: &RemoteJob) -> Result<(), EngineError> {
        self.client.cancel(&job.backend_id).await
    }

    async fn transfer_output(&mut self, _job: &RemoteJob) -> Result<Vec<String>, EngineError> {
        // The head node shares the job workdir; output lands in place.
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "slurm_tests.rs"]
mod tests;

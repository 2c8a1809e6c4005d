// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector forking the solver as child processes on the monitor host.

use super::QueueConnector;
use crate::error::EngineError;
use async_trait::async_trait;
use qc_core::{JobId, RemoteJob, RemoteStatus};
use std::path::{Path, PathBuf};
use tokio::process::{Child, Command};

struct RunningChild {
    pid: u32,
    child: Child,
}

/// Runs `{solver_dir}/runqc input output` in the job workdir, up to
/// `maxjobs` children at a time. The backend id is the child PID.
pub struct LocalConnector {
    solver_dir: PathBuf,
    maxjobs: usize,
    time_limit_secs: u64,
    mem_limit_mb: u64,
    children: Vec<RunningChild>,
}

impl LocalConnector {
    pub fn new(
        solver_dir: impl Into<PathBuf>,
        maxjobs: usize,
        time_limit_secs: u64,
        mem_limit_mb: u64,
    ) -> Self {
        Self {
            solver_dir: solver_dir.into(),
            maxjobs,
            time_limit_secs,
            mem_limit_mb,
            children: Vec::new(),
        }
    }
}

#[async_trait]
impl QueueConnector for LocalConnector {
    async fn init(&mut self, jobs: Vec<RemoteJob>) -> Result<(), EngineError> {
        // Children of a previous monitor process cannot be re-adopted;
        // their jobs show up as gone on the next cycle and complete
        // through the normal transfer path.
        if !jobs.is_empty() {
            tracing::warn!(count = jobs.len(), "cannot re-adopt child processes after restart");
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<(), EngineError> {
        self.children.retain_mut(|running| {
            match running.child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    tracing::debug!(pid = running.pid, %status, "child exited");
                    false
                }
                Err(error) => {
                    tracing::warn!(pid = running.pid, %error, "child wait failed");
                    false
                }
            }
        });
        Ok(())
    }

    async fn get_status(&mut self, job: &RemoteJob) -> Result<Option<RemoteStatus>, EngineError> {
        let running = self
            .children
            .iter()
            .any(|c| c.pid.to_string() == job.backend_id);
        Ok(running.then_some(RemoteStatus::Running))
    }

    fn can_submit(&self) -> bool {
        self.children.len() < self.maxjobs
    }

    async fn submit(&mut self, jobid: &JobId, workdir: &Path) -> Result<RemoteJob, EngineError> {
        let exe = self.solver_dir.join("runqc");
        let child = Command::new(&exe)
            .args(["input", "output"])
            .current_dir(workdir)
            .env("QC_TIME_LIMIT", self.time_limit_secs.to_string())
            .env("QC_MEM_LIMIT", (self.mem_limit_mb * 1024).to_string())
            .spawn()
            .map_err(|e| EngineError::Submission(format!("spawn {}: {e}", exe.display())))?;
        let Some(pid) = child.id() else {
            return Err(EngineError::Submission(format!(
                "solver exited before start for job {jobid}"
            )));
        };
        tracing::info!(%jobid, pid, "spawned solver child");
        self.children.push(RunningChild { pid, child });
        Ok(RemoteJob {
            jobid: jobid.clone(),
            backend_id: pid.to_string(),
            local_dir: workdir.to_path_buf(),
            remote_dir: None,
        })
    }

    async fn terminate(&mut self, job: &RemoteJob) -> Result<(), EngineError> {
        for running in &mut self.children {
            if running.pid.to_string() == job.backend_id {
                if let Err(error) = running.child.start_kill() {
                    tracing::warn!(pid = running.pid, %error, "kill failed");
                }
            }
        }
        Ok(())
    }

    async fn transfer_output(&mut self, _job: &RemoteJob) -> Result<Vec<String>, EngineError> {
        // Files are already in the job workdir.
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;

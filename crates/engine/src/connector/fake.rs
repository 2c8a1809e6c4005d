// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted connector for driving the monitors in tests.

use super::QueueConnector;
use crate::error::EngineError;
use async_trait::async_trait;
use parking_lot::Mutex;
use qc_core::{JobId, RemoteJob, RemoteStatus};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Default)]
struct FakeState {
    capacity: usize,
    statuses: HashMap<String, Option<RemoteStatus>>,
    submissions: Vec<RemoteJob>,
    init_jobs: Vec<RemoteJob>,
    terminated: Vec<String>,
    fail_submit: bool,
    fail_transfer: bool,
    write_output: bool,
    fail_next_update: Option<String>,
    updates: u32,
    next_id: u32,
}

/// Connector whose backend is a hash map the test edits. Cloning the
/// handle shares state, so a test keeps one clone while the monitor
/// owns another.
#[derive(Clone)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                capacity,
                write_output: true,
                ..FakeState::default()
            })),
        }
    }

    /// Script the backend's answer for one job. `None` = gone.
    pub fn set_status(&self, backend_id: &str, status: Option<RemoteStatus>) {
        self.state.lock().statuses.insert(backend_id.to_string(), status);
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.state.lock().fail_submit = fail;
    }

    pub fn set_fail_transfer(&self, fail: bool) {
        self.state.lock().fail_transfer = fail;
    }

    /// Whether a successful transfer drops an `output` file into the
    /// job workdir (on by default).
    pub fn set_write_output(&self, write: bool) {
        self.state.lock().write_output = write;
    }

    /// Make the next `update()` fail as a transport error.
    pub fn fail_next_update(&self, message: &str) {
        self.state.lock().fail_next_update = Some(message.to_string());
    }

    pub fn submissions(&self) -> Vec<RemoteJob> {
        self.state.lock().submissions.clone()
    }

    pub fn init_jobs(&self) -> Vec<RemoteJob> {
        self.state.lock().init_jobs.clone()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.state.lock().terminated.clone()
    }

    pub fn update_count(&self) -> u32 {
        self.state.lock().updates
    }
}

#[async_trait]
impl QueueConnector for FakeConnector {
    async fn init(&mut self, jobs: Vec<RemoteJob>) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        for job in &jobs {
            state.statuses.entry(job.backend_id.clone()).or_insert(Some(RemoteStatus::Queued));
        }
        state.init_jobs = jobs;
        Ok(())
    }

    async fn update(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.updates += 1;
        if let Some(message) = state.fail_next_update.take() {
            return Err(EngineError::Transport(message));
        }
        Ok(())
    }

    async fn get_status(&mut self, job: &RemoteJob) -> Result<Option<RemoteStatus>, EngineError> {
        Ok(self
            .state
            .lock()
            .statuses
            .get(&job.backend_id)
            .copied()
            .unwrap_or(None))
    }

    fn can_submit(&self) -> bool {
        let state = self.state.lock();
        let active = state.statuses.values().filter(|s| s.is_some()).count();
        active < state.capacity
    }

    async fn submit(&mut self, jobid: &JobId, workdir: &Path) -> Result<RemoteJob, EngineError> {
        let mut state = self.state.lock();
        if state.fail_submit {
            return Err(EngineError::Submission("backend refused job".to_string()));
        }
        state.next_id += 1;
        let backend_id = format!("fake-{}", state.next_id);
        let remote = RemoteJob {
            jobid: jobid.clone(),
            backend_id: backend_id.clone(),
            local_dir: workdir.to_path_buf(),
            remote_dir: None,
        };
        state.statuses.insert(backend_id, Some(RemoteStatus::Queued));
        state.submissions.push(remote.clone());
        Ok(remote)
    }

    async fn terminate(&mut self, job: &RemoteJob) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.terminated.push(job.backend_id.clone());
        state.statuses.insert(job.backend_id.clone(), None);
        Ok(())
    }

    async fn transfer_output(&mut self, job: &RemoteJob) -> Result<Vec<String>, EngineError> {
        let state = self.state.lock();
        if state.fail_transfer {
            return Err(EngineError::Transfer("connection dropped".to_string()));
        }
        if state.write_output {
            std::fs::write(job.local_dir.join("output"), b"fake solver output\n")?;
            return Ok(vec!["output".to_string()]);
        }
        Ok(Vec::new())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capability contract every execution backend exposes.

pub mod local;
pub mod slurm;
pub mod ssh;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use crate::error::EngineError;
use async_trait::async_trait;
use qc_core::{JobId, RemoteJob, RemoteStatus};
use std::path::Path;

/// One backend's view of the queue, consumed generically by the remote
/// queue monitor. Backends with very different semantics (synchronous
/// local children vs. an asynchronously polled scheduler) share this
/// contract; the monitor serialises all calls.
#[async_trait]
pub trait QueueConnector: Send {
    /// Reconcile with remote-job records recovered from the store after
    /// a monitor restart.
    async fn init(&mut self, jobs: Vec<RemoteJob>) -> Result<(), EngineError>;

    /// Refresh the cached view of the backend queue. May block on I/O.
    async fn update(&mut self) -> Result<(), EngineError>;

    /// Status of one job; `None` means the backend no longer knows it.
    async fn get_status(&mut self, job: &RemoteJob)
        -> Result<Option<RemoteStatus>, EngineError>;

    /// Capacity-admission predicate: true only when the backend has
    /// room for another job.
    fn can_submit(&self) -> bool;

    /// Copy inputs, build a job script if required, and issue the
    /// backend's submit command. The returned record is persisted so
    /// the job can be found again after a restart.
    async fn submit(&mut self, jobid: &JobId, workdir: &Path)
        -> Result<RemoteJob, EngineError>;

    /// Best-effort cancel.
    async fn terminate(&mut self, job: &RemoteJob) -> Result<(), EngineError>;

    /// Copy output files from the backend working directory into the
    /// local one, excluding the input and scheduler artefacts. An error
    /// is transient: the monitor retries on the next cycle.
    async fn transfer_output(&mut self, job: &RemoteJob)
        -> Result<Vec<String>, EngineError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job manager: sole creator of job records, facade for the
//! HTTP gateway.

use crate::connector::slurm::{squeue_state, SlurmClient};
use crate::error::EngineError;
use crate::local_monitor::has_output;
use crate::records::Records;
use crate::script::{self, SolverPaths};
use qc_core::{EventKind, JobEvent, JobId, JobRecord, JobStatus, RemoteJob, RemoteStatus};
use qc_wire::{MessageBus, StateStore};
use std::path::PathBuf;

/// The backend the manager may talk to synchronously: a workload
/// manager whose client binaries live on this host.
pub struct HeadNode {
    pub queue_id: String,
    pub client: SlurmClient,
    pub solver: SolverPaths,
}

pub struct JobManager<S, B> {
    records: Records<S>,
    bus: B,
    workdir_root: PathBuf,
    head: Option<HeadNode>,
}

impl<S: StateStore, B: MessageBus> JobManager<S, B> {
    pub fn new(store: S, bus: B, workdir_root: impl Into<PathBuf>) -> Self {
        Self {
            records: Records::new(store),
            bus,
            workdir_root: workdir_root.into(),
            head: None,
        }
    }

    /// Enable the synchronous head-node path for `$batch` submissions.
    pub fn with_head_node(mut self, head: HeadNode) -> Self {
        self.head = Some(head);
        self
    }

    /// Create a job from raw submission input.
    ///
    /// A `$batch … $end` prefix routes the job straight to the
    /// head-node backend without touching the bus; the record starts
    /// `QUEUED`. Otherwise the body is written to `input`, the record
    /// starts `NEW`, and `job_created` is emitted for the monitors.
    pub async fn submit(&self, raw_input: &str) -> Result<JobRecord, EngineError> {
        match script::split_directive(raw_input) {
            Some((directive, body)) => self.submit_batch(&directive, &body).await,
            None => self.submit_queued(raw_input).await,
        }
    }

    async fn submit_queued(&self, raw_input: &str) -> Result<JobRecord, EngineError> {
        let jobid = JobId::generate();
        let workdir = self.workdir(&jobid);
        tokio::fs::create_dir_all(&workdir).await?;
        tokio::fs::write(workdir.join("input"), raw_input).await?;

        let record = JobRecord::new(jobid.clone(), JobStatus::New, workdir);
        self.records.insert(&record).await?;
        self.bus
            .publish(&JobEvent::new(EventKind::Created, jobid.clone()))
            .await?;
        tracing::info!(%jobid, "job created");
        Ok(record)
    }

    async fn submit_batch(&self, directive: &str, body: &str) -> Result<JobRecord, EngineError> {
        let Some(head) = &self.head else {
            return Err(EngineError::Submission(
                "no head-node backend configured for $batch submissions".to_string(),
            ));
        };

        let jobid = JobId::generate();
        let workdir = self.workdir(&jobid);
        tokio::fs::create_dir_all(&workdir).await?;

        let names = script::batch_names(directive);
        let script_text = script::build_batch_script(directive, &workdir, &names, &head.solver);
        let script_path = workdir.join(&names.script);
        tokio::fs::write(&script_path, script_text).await?;
        tokio::fs::write(workdir.join(&names.input), body).await?;

        let mut record = JobRecord::new(jobid.clone(), JobStatus::Queued, workdir.clone());
        match head.client.submit_script(&script_path).await {
            Ok(backend_id) => {
                tracing::info!(%jobid, backend_id, "batch job submitted");
                record.backend_id = Some(backend_id.clone());
                self.records.insert(&record).await?;
                self.records
                    .save_remote(&RemoteJob {
                        jobid: jobid.clone(),
                        backend_id,
                        local_dir: workdir,
                        remote_dir: None,
                    })
                    .await?;
                self.records.push_submitted(&head.queue_id, &jobid).await?;
            }
            Err(error) => {
                tracing::error!(%jobid, %error, "batch submission failed");
                record.status = JobStatus::Error;
                record.error = Some(error.to_string());
                self.records.insert(&record).await?;
            }
        }
        Ok(record)
    }

    /// Fetch a record, refreshing head-node jobs by polling the
    /// scheduler when they are still in flight. Unknown ids yield the
    /// synthetic `DNE` record.
    pub async fn get(&self, jobid: &JobId) -> Result<JobRecord, EngineError> {
        let record = self.records.load(jobid).await?;
        if !record.is_valid() {
            return Ok(record);
        }
        if !matches!(record.status, JobStatus::Queued | JobStatus::Running) {
            return Ok(record);
        }
        let (Some(head), Some(backend_id)) = (&self.head, record.backend_id.clone()) else {
            return Ok(record);
        };
        if !self.bound_to(&head.queue_id, jobid).await? {
            return Ok(record);
        }
        self.refresh_head_job(head, jobid, &backend_id).await?;
        self.records.load(jobid).await
    }

    async fn refresh_head_job(
        &self,
        head: &HeadNode,
        jobid: &JobId,
        backend_id: &str,
    ) -> Result<(), EngineError> {
        match head.client.job_state(backend_id).await {
            Err(error) => {
                // Transient: serve the stored record.
                tracing::warn!(%jobid, %error, "scheduler poll failed");
            }
            Ok(Some(state)) => {
                if squeue_state(&state) == RemoteStatus::Running {
                    self.records.update_status(jobid, JobStatus::Running).await?;
                }
            }
            Ok(None) => {
                // Left the queue: finish via the legal walk. The
                // monitor sweeps the index entries on its next cycle.
                self.records.update_status(jobid, JobStatus::Running).await?;
                let files = self.records.refresh_files(jobid).await?;
                if has_output(&files) {
                    self.records.update_status(jobid, JobStatus::Done).await?;
                } else {
                    self.records
                        .update_status_error(jobid, "Missing output file")
                        .await?;
                }
                self.records.delete_remote(jobid).await?;
            }
        }
        Ok(())
    }

    /// Request termination. Jobs not yet claimed by a backend are
    /// removed by the local monitor; dispatched jobs are cancelled
    /// (best-effort) and marked `DELETED`.
    pub async fn delete(&self, jobid: &JobId) -> Result<(), EngineError> {
        let record = self.records.load(jobid).await?;
        if !record.is_valid() {
            return Err(EngineError::UnknownJob(jobid.clone()));
        }
        if record.status.is_terminal() {
            return Ok(());
        }

        if record.backend_id.is_none()
            && matches!(record.status, JobStatus::New | JobStatus::Queued)
        {
            self.bus
                .publish(&JobEvent::new(EventKind::TerminateRequested, jobid.clone()))
                .await?;
            return Ok(());
        }

        if let (Some(head), Some(backend_id)) = (&self.head, &record.backend_id) {
            if self.bound_to(&head.queue_id, jobid).await? {
                if let Err(error) = head.client.cancel(backend_id).await {
                    tracing::warn!(%jobid, %error, "scheduler cancel failed");
                }
            }
        }
        // Other backends cancel from the tombstone on their next cycle.
        self.records.update_status(jobid, JobStatus::Deleted).await?;
        tracing::info!(%jobid, "job deleted");
        Ok(())
    }

    pub async fn get_file(&self, jobid: &JobId, name: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let record = self.records.load(jobid).await?;
        if !record.is_valid() {
            return Err(EngineError::UnknownJob(jobid.clone()));
        }
        match tokio::fs::read(record.workdir.join(name)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_files(&self, jobid: &JobId) -> Result<Vec<String>, EngineError> {
        let record = self.records.load(jobid).await?;
        if !record.is_valid() {
            return Err(EngineError::UnknownJob(jobid.clone()));
        }
        Ok(record.files)
    }

    async fn bound_to(&self, q: &str, jobid: &JobId) -> Result<bool, EngineError> {
        Ok(self.records.list_submitted(q).await?.contains(jobid)
            || self.records.list_running(q).await?.contains(jobid))
    }

    fn workdir(&self, jobid: &JobId) -> PathBuf {
        self.workdir_root.join(jobid.as_str())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling monitor for one execution backend.
//!
//! Owns its connector and the `submitted[q]`/`running[q]` indices.
//! Each cycle refreshes the backend view, reconciles every indexed job,
//! then dispatches from the shared new queue while capacity lasts.

use crate::connector::QueueConnector;
use crate::error::EngineError;
use crate::records::Records;
use qc_core::{EventKind, JobEvent, JobId, RemoteStatus};
use qc_wire::{MessageBus, StateStore};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct RemoteQueueMonitor<C, S, B> {
    queue_id: String,
    connector: C,
    records: Records<S>,
    bus: B,
    period: Duration,
}

impl<C, S, B> RemoteQueueMonitor<C, S, B>
where
    C: QueueConnector,
    S: StateStore,
    B: MessageBus,
{
    pub fn new(
        queue_id: impl Into<String>,
        connector: C,
        store: S,
        bus: B,
        period: Duration,
    ) -> Self {
        Self {
            queue_id: queue_id.into(),
            connector,
            records: Records::new(store),
            bus,
            period,
        }
    }

    /// Hand persisted in-flight jobs back to the connector so it can
    /// reconcile after a restart.
    pub async fn recover(&mut self) -> Result<(), EngineError> {
        let mut jobs = Vec::new();
        for jobid in self.indexed_jobs().await? {
            if let Some(remote) = self.records.load_remote(&jobid).await? {
                jobs.push(remote);
            }
        }
        tracing::info!(queue = %self.queue_id, jobs = jobs.len(), "recovering in-flight jobs");
        self.connector.init(jobs).await
    }

    /// Recover, then poll until shutdown. Cycle failures are logged and
    /// retried on the next period.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), EngineError> {
        self.recover().await?;
        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }
            if let Err(error) = self.run_once().await {
                tracing::warn!(queue = %self.queue_id, %error, "monitor cycle failed");
            }
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.period) => {}
            }
        }
    }

    /// One monitor cycle: refresh, classify, dispatch.
    pub async fn run_once(&mut self) -> Result<(), EngineError> {
        if let Err(error) = self.connector.update().await {
            // Transport trouble: the connector has reset itself; try
            // again next cycle without touching any state.
            tracing::warn!(queue = %self.queue_id, %error, "backend refresh failed, skipping cycle");
            return Ok(());
        }

        let submitted = self.records.list_submitted(&self.queue_id).await?;
        let running = self.records.list_running(&self.queue_id).await?;
        for jobid in submitted.iter().chain(running.iter()) {
            let newly_submitted = submitted.contains(jobid);
            if let Err(error) = self.classify(jobid, newly_submitted).await {
                tracing::warn!(queue = %self.queue_id, %jobid, %error, "job reconcile failed");
            }
        }

        self.dispatch().await
    }

    async fn classify(&mut self, jobid: &JobId, newly_submitted: bool) -> Result<(), EngineError> {
        let record = self.records.load(jobid).await?;

        // Terminal records still indexed: deletion tombstones from the
        // manager, or completions applied through the synchronous
        // refresh path. Cancel if asked, then clean up.
        if record.status.is_terminal() || !record.is_valid() {
            if record.status == qc_core::JobStatus::Deleted {
                if let Some(remote) = self.records.load_remote(jobid).await? {
                    self.connector.terminate(&remote).await?;
                }
            }
            self.drop_job(jobid).await?;
            return Ok(());
        }

        let Some(remote) = self.records.load_remote(jobid).await? else {
            tracing::warn!(%jobid, "indexed job has no remote record, dropping");
            self.drop_job(jobid).await?;
            return Ok(());
        };

        match self.connector.get_status(&remote).await? {
            // Gone from the backend: completed or vanished. Only a
            // successful output transfer finishes the job; a transfer
            // failure is retried next cycle.
            None => match self.connector.transfer_output(&remote).await {
                Ok(files) => {
                    tracing::debug!(%jobid, ?files, "output transferred");
                    self.drop_job(jobid).await?;
                    self.bus
                        .publish(&JobEvent::new(EventKind::Completed, jobid.clone()))
                        .await?;
                }
                Err(error) => {
                    tracing::warn!(%jobid, %error, "output transfer failed, retrying next cycle");
                }
            },
            Some(RemoteStatus::Running) if newly_submitted => {
                self.records.remove_submitted(&self.queue_id, jobid).await?;
                self.records.push_running(&self.queue_id, jobid).await?;
                self.bus
                    .publish(&JobEvent::new(EventKind::Started, jobid.clone()))
                    .await?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Pop from the shared new queue while the backend has room. This
    /// is the handoff point between the monitors: the queue lives in
    /// the store, not on the bus.
    async fn dispatch(&mut self) -> Result<(), EngineError> {
        while self.connector.can_submit() {
            let Some(jobid) = self.records.pop_new().await? else {
                break;
            };
            let record = self.records.load(&jobid).await?;
            if !record.is_valid() {
                tracing::warn!(%jobid, "queued job has no record, dropping");
                continue;
            }
            if record.status.is_terminal() {
                continue;
            }
            match self.connector.submit(&jobid, &record.workdir).await {
                Ok(remote) => {
                    self.records.save_remote(&remote).await?;
                    self.records.set_backend_id(&jobid, &remote.backend_id).await?;
                    self.records.push_submitted(&self.queue_id, &jobid).await?;
                    self.bus
                        .publish(&JobEvent::new(EventKind::Submitted, jobid))
                        .await?;
                }
                Err(error) => {
                    tracing::warn!(%jobid, %error, "submission failed");
                    self.bus
                        .publish(&JobEvent::error(jobid, error.to_string()))
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn drop_job(&self, jobid: &JobId) -> Result<(), EngineError> {
        self.records.remove_submitted(&self.queue_id, jobid).await?;
        self.records.remove_running(&self.queue_id, jobid).await?;
        self.records.delete_remote(jobid).await?;
        Ok(())
    }

    async fn indexed_jobs(&self) -> Result<Vec<JobId>, EngineError> {
        let mut jobs = self.records.list_submitted(&self.queue_id).await?;
        jobs.extend(self.records.list_running(&self.queue_id).await?);
        Ok(jobs)
    }
}

#[cfg(test)]
#[path = "remote_monitor_tests.rs"]
mod tests;

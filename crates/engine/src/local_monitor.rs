// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Singleton consumer of all job events.
//!
//! The only component permitted to write status transitions triggered
//! by bus events. Handlers are idempotent: messages may be redelivered,
//! and re-applying an event to a record already in the target state is
//! a no-op (the CAS layer refuses the walk).

use crate::error::EngineError;
use crate::records::Records;
use qc_core::{EventKind, JobEvent, JobStatus};
use qc_wire::{Delivery, MessageBus, StateStore};
use tokio_util::sync::CancellationToken;

/// Durable queue this monitor binds to every routing key.
pub const QUEUE_NAME: &str = "jobevents.local";

pub struct LocalQueueMonitor<S, B> {
    records: Records<S>,
    bus: B,
}

impl<S: StateStore, B: MessageBus> LocalQueueMonitor<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { records: Records::new(store), bus }
    }

    /// Consume until shutdown. Store failures are fatal for the task;
    /// the in-flight message stays unacked and is redelivered.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), EngineError> {
        let mut sub = self.bus.subscribe(QUEUE_NAME, &EventKind::ALL).await?;
        tracing::info!(queue = QUEUE_NAME, "local queue monitor listening");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = sub.next() => {
                    let Some(delivery) = next else {
                        return Err(EngineError::Bus(qc_wire::BusError::Closed));
                    };
                    self.handle_delivery(delivery).await?;
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: Delivery) -> Result<(), EngineError> {
        let Some(kind) = delivery.kind() else {
            tracing::warn!(key = delivery.routing_key, "unknown routing key, acking");
            delivery.ack().await?;
            return Ok(());
        };
        match JobEvent::decode(kind, &delivery.body) {
            Ok(event) => self.handle(&event).await?,
            Err(error) => {
                tracing::warn!(%kind, %error, "undecodable event body, acking");
            }
        }
        delivery.ack().await?;
        Ok(())
    }

    /// Apply one event. Public so tests can drive the monitor without
    /// a bus.
    pub async fn handle(&self, event: &JobEvent) -> Result<(), EngineError> {
        tracing::debug!(kind = %event.kind, jobid = %event.jobid, "handling event");
        match event.kind {
            EventKind::Created => self.on_created(event).await,
            EventKind::Submitted => self.on_submitted(event).await,
            EventKind::Started => self.on_started(event).await,
            EventKind::Completed => self.on_completed(event).await,
            EventKind::TerminateRequested => self.on_terminate_requested(event).await,
            EventKind::Error => self.on_error(event).await,
        }
    }

    async fn on_created(&self, event: &JobEvent) -> Result<(), EngineError> {
        self.records.push_new(&event.jobid).await?;
        self.records.update_status(&event.jobid, JobStatus::Queued).await?;
        Ok(())
    }

    async fn on_submitted(&self, event: &JobEvent) -> Result<(), EngineError> {
        // The submitting monitor owns the backend indices; this side
        // only clears any stale new-queue entry and confirms the status.
        self.records.remove_new(&event.jobid).await?;
        self.records.update_status(&event.jobid, JobStatus::Queued).await?;
        Ok(())
    }

    async fn on_started(&self, event: &JobEvent) -> Result<(), EngineError> {
        self.records.update_status(&event.jobid, JobStatus::Running).await?;
        Ok(())
    }

    async fn on_completed(&self, event: &JobEvent) -> Result<(), EngineError> {
        let record = self.records.load(&event.jobid).await?;
        if !record.is_valid() {
            tracing::warn!(jobid = %event.jobid, "completion for unknown job");
            return Ok(());
        }
        if !matches!(record.status, JobStatus::Queued | JobStatus::Running) {
            // Terminal records absorb redelivery; anything else means
            // the completion raced ahead of this job's earlier events.
            return Ok(());
        }
        // A job can finish before its job_started was observed; walk
        // through RUNNING so the status history stays a legal walk.
        self.records.update_status(&event.jobid, JobStatus::Running).await?;
        let files = self.records.refresh_files(&event.jobid).await?;
        if has_output(&files) {
            self.records.update_status(&event.jobid, JobStatus::Done).await?;
        } else {
            self.records
                .update_status_error(&event.jobid, "Missing output file")
                .await?;
        }
        Ok(())
    }

    async fn on_terminate_requested(&self, event: &JobEvent) -> Result<(), EngineError> {
        let removed = self.records.remove_new(&event.jobid).await?;
        if removed > 0 {
            self.records.update_status(&event.jobid, JobStatus::Deleted).await?;
        }
        // Already claimed by a backend: its monitor cancels.
        Ok(())
    }

    async fn on_error(&self, event: &JobEvent) -> Result<(), EngineError> {
        self.records.remove_new(&event.jobid).await?;
        let message = event.error.as_deref().unwrap_or("unknown error");
        self.records.update_status_error(&event.jobid, message).await?;
        Ok(())
    }
}

/// Completion rule: the canonical `output` file, or a derived
/// `{job-name}.out` produced by a directive-path script.
pub(crate) fn has_output(files: &[String]) -> bool {
    files.iter().any(|f| f == "output" || f.ends_with(".out"))
}

#[cfg(test)]
#[path = "local_monitor_tests.rs"]
mod tests;

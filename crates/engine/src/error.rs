// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error classification.
//!
//! Only submission failures, missing output, and unknown jobs ever
//! surface in a job's user-facing status; transfer and transport
//! failures are retried by the monitors.

use qc_core::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Backend refused the job; the job transitions to `ERROR`.
    #[error("submission failed: {0}")]
    Submission(String),

    /// Remote file transfer did not complete; retried next cycle.
    #[error("output transfer failed: {0}")]
    Transfer(String),

    /// The backend transport (secure shell, subprocess) is unusable;
    /// the connector resets and the cycle is skipped.
    #[error("backend transport failure: {0}")]
    Transport(String),

    /// Query for an id the store does not know.
    #[error("unknown job: {0}")]
    UnknownJob(JobId),

    #[error(transparent)]
    Store(#[from] qc_wire::StoreError),

    #[error(transparent)]
    Bus(#[from] qc_wire::BusError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

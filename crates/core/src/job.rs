// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical persistent description of one submission.

use crate::id::JobId;
use crate::status::JobStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Job record, stored as JSON under `job:{jobid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub jobid: JobId,
    /// Backend-assigned id, minted by the connector after submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<String>,
    pub status: JobStatus,
    /// Filenames present in the job's working directory.
    pub files: Vec<String>,
    /// Human-readable cause, present only when `status = ERROR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Filesystem path private to this job, created at submission.
    pub workdir: PathBuf,
}

impl JobRecord {
    /// Fresh record for a newly created job.
    pub fn new(jobid: JobId, status: JobStatus, workdir: PathBuf) -> Self {
        Self {
            jobid,
            backend_id: None,
            status,
            files: Vec::new(),
            error: None,
            workdir,
        }
    }

    /// Synthetic record the store answers for an unknown id.
    pub fn dne(jobid: JobId) -> Self {
        Self {
            jobid,
            backend_id: None,
            status: JobStatus::Dne,
            files: Vec::new(),
            error: None,
            workdir: PathBuf::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status != JobStatus::Dne
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-backend payload a connector needs to find its job again.

use crate::id::JobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Remote-job record, stored as JSON under `remote:{jobid}`.
///
/// Persisted alongside the job record so a restarted monitor can hand
/// its in-flight jobs back to the connector's `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteJob {
    pub jobid: JobId,
    /// Backend-assigned id: child PID for the local connector, the
    /// scheduler's job id for batch backends.
    pub backend_id: String,
    /// Job working directory on this host.
    pub local_dir: PathBuf,
    /// Working directory on the remote host, when the backend has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_dir: Option<PathBuf>,
}

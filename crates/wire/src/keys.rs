// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store key names shared by every component.

use qc_core::JobId;

/// The shared queue of jobs not yet claimed by any backend.
pub const NEW_QUEUE: &str = "localqueue:new";

/// JSON blob of the job record.
pub fn job(jobid: &JobId) -> String {
    format!("job:{jobid}")
}

/// JSON blob of the remote-job record.
pub fn remote(jobid: &JobId) -> String {
    format!("remote:{jobid}")
}

/// Ordered jobids submitted to backend `q` but not yet seen running.
pub fn submitted(q: &str) -> String {
    format!("remotequeue:{q}:submitted")
}

/// Ordered jobids running on backend `q`.
pub fn running(q: &str) -> String {
    format!("remotequeue:{q}:running")
}

/// Hash with `id` and password hash for one user.
pub fn user(name: &str) -> String {
    format!("user:{name}")
}

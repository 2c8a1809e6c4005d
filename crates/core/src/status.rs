// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status and the legal transition graph.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job record.
///
/// `Dne` is synthetic: the store returns it for an unknown id and it is
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    New,
    Queued,
    Running,
    Done,
    Error,
    Deleted,
    Dne,
}

impl JobStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Deleted)
    }

    /// Whether moving to `next` is a legal walk on the transition graph.
    ///
    /// Re-applying the current status is legal (idempotent no-op) so
    /// redelivered events are absorbed without error.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (New, Queued)
                | (Queued, Running)
                | (Running, Done)
                | (New | Queued | Running, Error)
                | (New | Queued | Running, Deleted)
        )
    }
}

crate::simple_display! {
    JobStatus {
        New => "NEW",
        Queued => "QUEUED",
        Running => "RUNNING",
        Done => "DONE",
        Error => "ERROR",
        Deleted => "DELETED",
        Dne => "DNE",
    }
}

/// What a backend reports for a job still known to it.
///
/// Connectors answer `Option<RemoteStatus>`; `None` means the job is no
/// longer present on the backend (completed or vanished).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Running,
    Done,
    /// Unrecognised backend state; treated as transient by the monitor.
    Unknown,
}

crate::simple_display! {
    RemoteStatus {
        Queued => "QUEUED",
        Running => "RUNNING",
        Done => "DONE",
        Unknown => "UNKNOWN",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

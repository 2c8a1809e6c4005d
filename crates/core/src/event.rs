// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job events published on the bus.
//!
//! Events are routing-keyed by kind on the `aimm.jobqueue` exchange so
//! monitors can bind to the subset they care about. Bodies are UTF-8
//! JSON objects `{jobid, [error]}`.

use crate::id::JobId;
use serde::{Deserialize, Serialize};

/// Name of the direct exchange all job events travel on.
pub const EXCHANGE: &str = "aimm.jobqueue";

/// The closed set of event kinds, bijective with routing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Submitted,
    Started,
    Completed,
    TerminateRequested,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Created,
        EventKind::Submitted,
        EventKind::Started,
        EventKind::Completed,
        EventKind::TerminateRequested,
        EventKind::Error,
    ];

    pub fn routing_key(self) -> &'static str {
        match self {
            EventKind::Created => "job_created",
            EventKind::Submitted => "job_submitted",
            EventKind::Started => "job_started",
            EventKind::Completed => "job_completed",
            EventKind::TerminateRequested => "job_terminate_requested",
            EventKind::Error => "job_error",
        }
    }

    pub fn from_routing_key(key: &str) -> Option<Self> {
        EventKind::ALL.into_iter().find(|k| k.routing_key() == key)
    }
}

crate::simple_display! {
    EventKind {
        Created => "job_created",
        Submitted => "job_submitted",
        Started => "job_started",
        Completed => "job_completed",
        TerminateRequested => "job_terminate_requested",
        Error => "job_error",
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EventBody {
    jobid: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// An immutable job notification: a kind, the job it concerns, and an
/// optional error payload (only `job_error` carries one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub kind: EventKind,
    pub jobid: JobId,
    pub error: Option<String>,
}

impl JobEvent {
    pub fn new(kind: EventKind, jobid: JobId) -> Self {
        Self { kind, jobid, error: None }
    }

    pub fn error(jobid: JobId, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            jobid,
            error: Some(message.into()),
        }
    }

    /// Serialize the body for publication under `self.kind`'s routing key.
    pub fn encode(&self) -> Vec<u8> {
        let body = EventBody {
            jobid: self.jobid.clone(),
            error: self.error.clone(),
        };
        // A struct of a string and an optional string cannot fail to serialize.
        serde_json::to_vec(&body).unwrap_or_default()
    }

    /// Decode a consumed delivery. The kind comes from the routing key.
    pub fn decode(kind: EventKind, body: &[u8]) -> Result<Self, serde_json::Error> {
        let body: EventBody = serde_json::from_slice(body)?;
        Ok(Self {
            kind,
            jobid: body.jobid,
            error: body.error,
        })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

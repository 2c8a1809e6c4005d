// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    new_to_queued      = { JobStatus::New, JobStatus::Queued },
    queued_to_running  = { JobStatus::Queued, JobStatus::Running },
    running_to_done    = { JobStatus::Running, JobStatus::Done },
    new_to_error       = { JobStatus::New, JobStatus::Error },
    queued_to_error    = { JobStatus::Queued, JobStatus::Error },
    running_to_error   = { JobStatus::Running, JobStatus::Error },
    new_to_deleted     = { JobStatus::New, JobStatus::Deleted },
    queued_to_deleted  = { JobStatus::Queued, JobStatus::Deleted },
    running_to_deleted = { JobStatus::Running, JobStatus::Deleted },
)]
fn legal_transitions(from: JobStatus, to: JobStatus) {
    assert!(from.can_transition_to(to));
}

#[parameterized(
    queued_back_to_new    = { JobStatus::Queued, JobStatus::New },
    running_back_to_queued = { JobStatus::Running, JobStatus::Queued },
    new_to_running        = { JobStatus::New, JobStatus::Running },
    new_to_done           = { JobStatus::New, JobStatus::Done },
    queued_to_done        = { JobStatus::Queued, JobStatus::Done },
    done_to_running       = { JobStatus::Done, JobStatus::Running },
    error_to_queued       = { JobStatus::Error, JobStatus::Queued },
    deleted_to_done       = { JobStatus::Deleted, JobStatus::Done },
    dne_to_new            = { JobStatus::Dne, JobStatus::New },
)]
fn illegal_transitions(from: JobStatus, to: JobStatus) {
    assert!(!from.can_transition_to(to));
}

#[test]
fn same_status_is_always_legal() {
    for s in [
        JobStatus::New,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Error,
        JobStatus::Deleted,
    ] {
        assert!(s.can_transition_to(s), "{s} -> {s} should be a no-op");
    }
}

#[test]
fn terminal_statuses() {
    assert!(JobStatus::Done.is_terminal());
    assert!(JobStatus::Error.is_terminal());
    assert!(JobStatus::Deleted.is_terminal());
    assert!(!JobStatus::New.is_terminal());
    assert!(!JobStatus::Queued.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
    assert!(!JobStatus::Dne.is_terminal());
}

#[test]
fn wire_form_is_screaming_case() {
    assert_eq!(serde_json::to_string(&JobStatus::New).unwrap(), "\"NEW\"");
    assert_eq!(serde_json::to_string(&JobStatus::Done).unwrap(), "\"DONE\"");
    let parsed: JobStatus = serde_json::from_str("\"RUNNING\"").unwrap();
    assert_eq!(parsed, JobStatus::Running);
}

#[test]
fn display_matches_wire_form() {
    assert_eq!(JobStatus::Queued.to_string(), "QUEUED");
    assert_eq!(JobStatus::Dne.to_string(), "DNE");
    assert_eq!(RemoteStatus::Unknown.to_string(), "UNKNOWN");
}

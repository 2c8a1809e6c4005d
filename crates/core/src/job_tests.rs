// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_record_starts_clean() {
    let record = JobRecord::new(JobId::new("j1"), JobStatus::New, "/work/j1".into());
    assert_eq!(record.status, JobStatus::New);
    assert!(record.backend_id.is_none());
    assert!(record.files.is_empty());
    assert!(record.error.is_none());
    assert!(record.is_valid());
}

#[test]
fn dne_record_is_invalid() {
    let record = JobRecord::dne(JobId::new("missing"));
    assert_eq!(record.status, JobStatus::Dne);
    assert!(!record.is_valid());
}

#[test]
fn serde_round_trip() {
    let mut record = JobRecord::new(JobId::new("j2"), JobStatus::Queued, "/work/j2".into());
    record.backend_id = Some("4217".to_string());
    record.files = vec!["input".to_string(), "output".to_string()];

    let json = serde_json::to_string(&record).unwrap();
    let parsed: JobRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn absent_optionals_are_omitted() {
    let record = JobRecord::new(JobId::new("j3"), JobStatus::New, "/work/j3".into());
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("backend_id"));
    assert!(!json.contains("error"));
}

#[test]
fn reads_record_without_optional_fields() {
    // Records written before a backend claimed the job have no backend_id.
    let json = r#"{"jobid":"j4","status":"NEW","files":[],"workdir":"/work/j4"}"#;
    let parsed: JobRecord = serde_json::from_str(json).unwrap();
    assert!(parsed.backend_id.is_none());
    assert!(parsed.error.is_none());
}

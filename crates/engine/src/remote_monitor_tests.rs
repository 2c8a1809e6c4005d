// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::connector::fake::FakeConnector;
use qc_core::{JobEvent, JobRecord, JobStatus};
use qc_wire::{MemoryBus, MemoryStore, Subscription};
use std::time::Duration;

const Q: &str = "rq1";

struct Harness {
    monitor: RemoteQueueMonitor<FakeConnector, MemoryStore, MemoryBus>,
    connector: FakeConnector,
    records: Records<MemoryStore>,
    bus: MemoryBus,
    _workdir: tempfile::TempDir,
}

async fn harness(capacity: usize) -> Harness {
    let store = MemoryStore::new();
    let bus = MemoryBus::new();
    let connector = FakeConnector::new(capacity);
    let monitor = RemoteQueueMonitor::new(
        Q,
        connector.clone(),
        store.clone(),
        bus.clone(),
        Duration::from_millis(10),
    );
    Harness {
        monitor,
        connector,
        records: Records::new(store),
        bus,
        _workdir: tempfile::tempdir().unwrap(),
    }
}

async fn seed_new(h: &Harness, id: &str) -> JobId {
    let jobid = JobId::new(id);
    let workdir = h._workdir.path().join(id);
    std::fs::create_dir_all(&workdir).unwrap();
    std::fs::write(workdir.join("input"), "in").unwrap();
    let record = JobRecord::new(jobid.clone(), JobStatus::Queued, workdir);
    h.records.insert(&record).await.unwrap();
    h.records.push_new(&jobid).await.unwrap();
    jobid
}

/// Seed a job already submitted to the backend.
async fn seed_submitted(h: &Harness, id: &str, backend_id: &str) -> JobId {
    let jobid = JobId::new(id);
    let workdir = h._workdir.path().join(id);
    std::fs::create_dir_all(&workdir).unwrap();
    let mut record = JobRecord::new(jobid.clone(), JobStatus::Queued, workdir.clone());
    record.backend_id = Some(backend_id.to_string());
    h.records.insert(&record).await.unwrap();
    h.records
        .save_remote(&qc_core::RemoteJob {
            jobid: jobid.clone(),
            backend_id: backend_id.to_string(),
            local_dir: workdir,
            remote_dir: None,
        })
        .await
        .unwrap();
    h.records.push_submitted(Q, &jobid).await.unwrap();
    h.connector.set_status(backend_id, Some(RemoteStatus::Queued));
    jobid
}

async fn next_event(sub: &mut Subscription) -> JobEvent {
    let delivery = tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("timed out waiting for event")
        .expect("bus closed");
    JobEvent::decode(delivery.kind().unwrap(), &delivery.body).unwrap()
}

async fn assert_no_event(sub: &mut Subscription) {
    let result = tokio::time::timeout(Duration::from_millis(20), sub.next()).await;
    assert!(result.is_err(), "unexpected event");
}

#[tokio::test]
async fn dispatches_new_job_to_backend() {
    let mut h = harness(2).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    let jobid = seed_new(&h, "j1").await;

    h.monitor.run_once().await.unwrap();

    let submissions = h.connector.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].jobid, jobid);

    assert_eq!(h.records.list_submitted(Q).await.unwrap(), vec![jobid.clone()]);
    assert_eq!(h.records.pop_new().await.unwrap(), None);
    assert!(h.records.load_remote(&jobid).await.unwrap().is_some());
    assert_eq!(
        h.records.load(&jobid).await.unwrap().backend_id,
        Some("fake-1".to_string())
    );

    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::Submitted);
    assert_eq!(event.jobid, jobid);
}

#[tokio::test]
async fn respects_backend_capacity() {
    let mut h = harness(1).await;
    let first = seed_new(&h, "j1").await;
    let second = seed_new(&h, "j2").await;

    h.monitor.run_once().await.unwrap();

    assert_eq!(h.connector.submissions().len(), 1);
    assert_eq!(h.records.list_submitted(Q).await.unwrap(), vec![first]);
    // Second job stays queued for a later cycle.
    assert_eq!(h.records.pop_new().await.unwrap(), Some(second));
}

#[tokio::test]
async fn empty_new_queue_does_not_block() {
    let mut h = harness(1).await;
    h.monitor.run_once().await.unwrap();
    assert!(h.connector.submissions().is_empty());
}

#[tokio::test]
async fn submission_failure_emits_job_error() {
    let mut h = harness(1).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    let jobid = seed_new(&h, "j1").await;
    h.connector.set_fail_submit(true);

    h.monitor.run_once().await.unwrap();

    assert!(h.records.list_submitted(Q).await.unwrap().is_empty());
    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::Error);
    assert_eq!(event.jobid, jobid);
    assert!(event.error.unwrap().contains("backend refused job"));
}

#[tokio::test]
async fn started_job_moves_to_running() {
    let mut h = harness(4).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    let jobid = seed_submitted(&h, "j1", "b1").await;
    h.connector.set_status("b1", Some(RemoteStatus::Running));

    h.monitor.run_once().await.unwrap();

    assert!(h.records.list_submitted(Q).await.unwrap().is_empty());
    assert_eq!(h.records.list_running(Q).await.unwrap(), vec![jobid.clone()]);
    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::Started);
    assert_eq!(event.jobid, jobid);
}

#[tokio::test]
async fn unchanged_job_is_left_alone() {
    let mut h = harness(4).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    let jobid = seed_submitted(&h, "j1", "b1").await;

    h.monitor.run_once().await.unwrap();

    assert_eq!(h.records.list_submitted(Q).await.unwrap(), vec![jobid]);
    assert_no_event(&mut sub).await;
}

#[tokio::test]
async fn gone_job_completes_after_transfer() {
    let mut h = harness(4).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    let jobid = seed_submitted(&h, "j1", "b1").await;
    h.records.remove_submitted(Q, &jobid).await.unwrap();
    h.records.push_running(Q, &jobid).await.unwrap();
    h.connector.set_status("b1", None);

    h.monitor.run_once().await.unwrap();

    assert!(h.records.list_running(Q).await.unwrap().is_empty());
    assert!(h.records.load_remote(&jobid).await.unwrap().is_none());
    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::Completed);
    assert_eq!(event.jobid, jobid);
}

#[tokio::test]
async fn transfer_failure_retries_next_cycle() {
    let mut h = harness(4).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    let jobid = seed_submitted(&h, "j1", "b1").await;
    h.connector.set_status("b1", None);
    h.connector.set_fail_transfer(true);

    h.monitor.run_once().await.unwrap();

    // Still indexed, remote record kept, no completion event.
    assert_eq!(h.records.list_submitted(Q).await.unwrap(), vec![jobid.clone()]);
    assert!(h.records.load_remote(&jobid).await.unwrap().is_some());
    assert_no_event(&mut sub).await;

    // Transfer recovers on the next cycle.
    h.connector.set_fail_transfer(false);
    h.monitor.run_once().await.unwrap();
    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::Completed);
}

#[tokio::test]
async fn transport_failure_skips_the_cycle() {
    let mut h = harness(4).await;
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();
    seed_new(&h, "j1").await;
    h.connector.fail_next_update("connection reset");

    h.monitor.run_once().await.unwrap();

    // Nothing dispatched, no events; next cycle resumes normally.
    assert!(h.connector.submissions().is_empty());
    assert_no_event(&mut sub).await;

    h.monitor.run_once().await.unwrap();
    assert_eq!(h.connector.update_count(), 2);
    assert_eq!(h.connector.submissions().len(), 1);
}

#[tokio::test]
async fn deleted_job_is_cancelled_and_swept() {
    let mut h = harness(4).await;
    let jobid = seed_submitted(&h, "j1", "b1").await;
    h.records.update_status(&jobid, JobStatus::Deleted).await.unwrap();

    h.monitor.run_once().await.unwrap();

    assert_eq!(h.connector.terminated(), vec!["b1".to_string()]);
    assert!(h.records.list_submitted(Q).await.unwrap().is_empty());
    assert!(h.records.load_remote(&jobid).await.unwrap().is_none());
}

#[tokio::test]
async fn recovery_hands_records_to_connector() {
    let mut h = harness(4).await;
    let first = seed_submitted(&h, "j1", "b1").await;
    let second = seed_submitted(&h, "j2", "b2").await;
    h.records.remove_submitted(Q, &second).await.unwrap();
    h.records.push_running(Q, &second).await.unwrap();

    h.monitor.recover().await.unwrap();

    let recovered: Vec<_> = h.connector.init_jobs().into_iter().map(|j| j.jobid).collect();
    assert_eq!(recovered, vec![first, second]);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::records::Records;
use qc_wire::{MemoryBus, MemoryStore, Subscription};
use std::time::Duration;

struct Harness {
    manager: JobManager<MemoryStore, MemoryBus>,
    records: Records<MemoryStore>,
    bus: MemoryBus,
    _root: tempfile::TempDir,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let bus = MemoryBus::new();
    let root = tempfile::tempdir().unwrap();
    Harness {
        manager: JobManager::new(store.clone(), bus.clone(), root.path()),
        records: Records::new(store),
        bus,
        _root: root,
    }
}

async fn next_event(sub: &mut Subscription) -> JobEvent {
    let delivery = tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("timed out waiting for event")
        .expect("bus closed");
    JobEvent::decode(delivery.kind().unwrap(), &delivery.body).unwrap()
}

#[tokio::test]
async fn submit_creates_record_and_emits_created() {
    let h = harness();
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();

    let record = h.manager.submit("$molecule\n0 1\nH 0 0 0\n$end\n").await.unwrap();
    assert_eq!(record.status, JobStatus::New);
    assert!(record.backend_id.is_none());

    let input = std::fs::read_to_string(record.workdir.join("input")).unwrap();
    assert!(input.contains("H 0 0 0"));

    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::Created);
    assert_eq!(event.jobid, record.jobid);
}

#[tokio::test]
async fn get_unknown_returns_dne() {
    let h = harness();
    let record = h.manager.get(&JobId::new("nope")).await.unwrap();
    assert_eq!(record.status, JobStatus::Dne);
}

#[tokio::test]
async fn get_returns_stored_record() {
    let h = harness();
    let submitted = h.manager.submit("input body").await.unwrap();
    let fetched = h.manager.get(&submitted.jobid).await.unwrap();
    assert_eq!(fetched, submitted);
}

#[tokio::test]
async fn delete_unclaimed_requests_termination() {
    let h = harness();
    let record = h.manager.submit("input body").await.unwrap();
    let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();

    h.manager.delete(&record.jobid).await.unwrap();

    let event = next_event(&mut sub).await;
    assert_eq!(event.kind, EventKind::TerminateRequested);
    assert_eq!(event.jobid, record.jobid);
    // Status unchanged until the local monitor handles the request.
    assert_eq!(h.manager.get(&record.jobid).await.unwrap().status, JobStatus::New);
}

#[tokio::test]
async fn delete_unknown_is_an_error() {
    let h = harness();
    let result = h.manager.delete(&JobId::new("ghost")).await;
    assert!(matches!(result, Err(EngineError::UnknownJob(_))));
}

#[tokio::test]
async fn delete_terminal_is_a_noop() {
    let h = harness();
    let record = h.manager.submit("input body").await.unwrap();
    h.records.update_status(&record.jobid, JobStatus::Queued).await.unwrap();
    h.records.update_status(&record.jobid, JobStatus::Deleted).await.unwrap();

    h.manager.delete(&record.jobid).await.unwrap();
    assert_eq!(h.manager.get(&record.jobid).await.unwrap().status, JobStatus::Deleted);
}

#[tokio::test]
async fn file_access() {
    let h = harness();
    let record = h.manager.submit("the input body").await.unwrap();

    let data = h.manager.get_file(&record.jobid, "input").await.unwrap();
    assert_eq!(data, Some(b"the input body".to_vec()));
    assert_eq!(h.manager.get_file(&record.jobid, "missing").await.unwrap(), None);

    h.records.refresh_files(&record.jobid).await.unwrap();
    assert_eq!(h.manager.list_files(&record.jobid).await.unwrap(), vec!["input".to_string()]);
}

#[tokio::test]
async fn file_access_for_unknown_job_fails() {
    let h = harness();
    let result = h.manager.get_file(&JobId::new("ghost"), "input").await;
    assert!(matches!(result, Err(EngineError::UnknownJob(_))));
}

#[tokio::test]
async fn batch_submission_without_head_node_fails() {
    let h = harness();
    let result = h.manager.submit("$batch\n#SBATCH -N 1\n$end\nbody").await;
    assert!(matches!(result, Err(EngineError::Submission(_))));
}

#[cfg(unix)]
mod head_node {
    use super::*;
    use crate::connector::slurm::SlurmClient;
    use crate::script::SolverPaths;
    use std::os::unix::fs::PermissionsExt;

    /// Drop fake scheduler binaries into a directory. `squeue` prints
    /// the contents of `squeue.txt` so tests can script its answer.
    fn fake_scheduler(dir: &std::path::Path) {
        let scripts = [
            ("sbatch", "#!/bin/sh\necho \"Submitted batch job 42\"\n"),
            ("squeue", "#!/bin/sh\ncat \"$(dirname \"$0\")/squeue.txt\" 2>/dev/null\n"),
            ("scancel", "#!/bin/sh\nexit 0\n"),
        ];
        for (name, body) in scripts {
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    fn head_harness() -> (Harness, std::path::PathBuf) {
        let h = harness();
        let bin_dir = h._root.path().join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        fake_scheduler(&bin_dir);
        let head = HeadNode {
            queue_id: "head".to_string(),
            client: SlurmClient::new(&bin_dir, "qcuser"),
            solver: SolverPaths::default(),
        };
        let manager = JobManager::new(
            h.records.store().clone(),
            h.bus.clone(),
            h._root.path().join("jobs"),
        )
        .with_head_node(head);
        let harness = Harness { manager, ..h };
        (harness, bin_dir)
    }

    #[tokio::test]
    async fn batch_submission_is_synchronous() {
        let (h, _bin) = head_harness();
        let mut sub = h.bus.subscribe("probe", &EventKind::ALL).await.unwrap();

        let raw = "$batch\n#SBATCH --job-name=water\n$end\n$molecule\n0 1\nH 0 0 0\n$end\n";
        let record = h.manager.submit(raw).await.unwrap();

        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.backend_id.as_deref(), Some("42"));

        // Script carries the user directive plus the appended chdir.
        let script = std::fs::read_to_string(record.workdir.join("water.bat")).unwrap();
        assert!(script.contains("#SBATCH --job-name=water"));
        assert!(script.contains(&format!("#SBATCH --chdir={}", record.workdir.display())));
        let input = std::fs::read_to_string(record.workdir.join("water.inp")).unwrap();
        assert!(input.contains("$molecule"));

        // Bound to the head backend, and no bus event was emitted.
        assert_eq!(
            h.records.list_submitted("head").await.unwrap(),
            vec![record.jobid.clone()]
        );
        assert!(h.records.load_remote(&record.jobid).await.unwrap().is_some());
        let no_event = tokio::time::timeout(Duration::from_millis(20), sub.next()).await;
        assert!(no_event.is_err(), "batch path must bypass the bus");
    }

    #[tokio::test]
    async fn get_refreshes_finished_head_job() {
        let (h, _bin) = head_harness();
        let raw = "$batch\n#SBATCH -N 1\n$end\nbody";
        let record = h.manager.submit(raw).await.unwrap();

        // Scheduler no longer lists the job; the solver wrote output.
        std::fs::write(record.workdir.join("output"), "done").unwrap();
        let refreshed = h.manager.get(&record.jobid).await.unwrap();

        assert_eq!(refreshed.status, JobStatus::Done);
        assert!(refreshed.files.contains(&"output".to_string()));
        assert!(refreshed.backend_id.is_none());
        assert!(h.records.load_remote(&record.jobid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_keeps_running_head_job() {
        let (h, bin) = head_harness();
        let raw = "$batch\n#SBATCH -N 1\n$end\nbody";
        let record = h.manager.submit(raw).await.unwrap();

        std::fs::write(bin.join("squeue.txt"), "42 debug water qcuser R 1:00 1 node1\n").unwrap();
        let refreshed = h.manager.get(&record.jobid).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn delete_cancels_head_job() {
        let (h, _bin) = head_harness();
        let raw = "$batch\n#SBATCH -N 1\n$end\nbody";
        let record = h.manager.submit(raw).await.unwrap();

        h.manager.delete(&record.jobid).await.unwrap();
        let deleted = h.records.load(&record.jobid).await.unwrap();
        assert_eq!(deleted.status, JobStatus::Deleted);
        assert!(deleted.backend_id.is_none());
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed access to job records and queue indices.
//!
//! Every record write goes through an optimistic check-and-set loop:
//! read, mutate, write-if-unchanged, retry on conflict. Writers that
//! observe a terminal status or an illegal transition abandon the write,
//! which is what absorbs redelivered events.

use crate::error::EngineError;
use qc_core::{JobId, JobRecord, JobStatus, RemoteJob};
use qc_wire::{keys, StateStore, StoreError};

/// Outcome of a record write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
    /// The record was updated.
    Applied,
    /// The write was abandoned: target equals the current status, the
    /// transition is illegal, or the record is already terminal.
    Skipped,
}

/// Store facade owned by each component.
#[derive(Clone)]
pub struct Records<S> {
    store: S,
}

impl<S: StateStore> Records<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load a record; unknown ids yield the synthetic `DNE` record.
    pub async fn load(&self, jobid: &JobId) -> Result<JobRecord, EngineError> {
        let key = keys::job(jobid);
        match self.store.get(&key).await? {
            Some(raw) => Ok(decode(&key, &raw)?),
            None => Ok(JobRecord::dne(jobid.clone())),
        }
    }

    /// First write of a fresh record. Plain set: creation has a single
    /// writer (the job manager).
    pub async fn insert(&self, record: &JobRecord) -> Result<(), EngineError> {
        let key = keys::job(&record.jobid);
        self.store.set(&key, &encode(record)).await?;
        Ok(())
    }

    /// CAS a status transition. Illegal walks and writes against a
    /// terminal record are skipped, not errors.
    pub async fn update_status(
        &self,
        jobid: &JobId,
        status: JobStatus,
    ) -> Result<StatusWrite, EngineError> {
        self.mutate(jobid, |record| apply_status(record, status, None))
            .await
    }

    /// CAS to `ERROR` with a cause.
    pub async fn update_status_error(
        &self,
        jobid: &JobId,
        message: &str,
    ) -> Result<StatusWrite, EngineError> {
        self.mutate(jobid, |record| {
            apply_status(record, JobStatus::Error, Some(message))
        })
        .await
    }

    /// Record the backend-assigned id after a successful submission.
    pub async fn set_backend_id(
        &self,
        jobid: &JobId,
        backend_id: &str,
    ) -> Result<StatusWrite, EngineError> {
        self.mutate(jobid, |record| {
            if record.status.is_terminal() || record.backend_id.as_deref() == Some(backend_id) {
                return false;
            }
            record.backend_id = Some(backend_id.to_string());
            true
        })
        .await
    }

    /// Re-list the working directory into the record's file set.
    pub async fn refresh_files(&self, jobid: &JobId) -> Result<Vec<String>, EngineError> {
        let record = self.load(jobid).await?;
        if !record.is_valid() {
            return Err(EngineError::UnknownJob(jobid.clone()));
        }
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&record.workdir).await?;
        while let Some(entry) = entries.next_entry().await? {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
        files.sort();
        let listed = files.clone();
        self.mutate(jobid, move |record| {
            if record.files == files {
                return false;
            }
            record.files = files.clone();
            true
        })
        .await?;
        Ok(listed)
    }

    async fn mutate<F>(&self, jobid: &JobId, f: F) -> Result<StatusWrite, EngineError>
    where
        F: Fn(&mut JobRecord) -> bool,
    {
        let key = keys::job(jobid);
        loop {
            let Some(raw) = self.store.get(&key).await? else {
                return Err(EngineError::UnknownJob(jobid.clone()));
            };
            let mut record = decode(&key, &raw)?;
            if !f(&mut record) {
                return Ok(StatusWrite::Skipped);
            }
            if self
                .store
                .set_if_unchanged(&key, Some(&raw), &encode(&record))
                .await?
            {
                return Ok(StatusWrite::Applied);
            }
            tracing::debug!(%jobid, "record write conflict, retrying");
        }
    }

    // Remote-job records

    pub async fn load_remote(&self, jobid: &JobId) -> Result<Option<RemoteJob>, EngineError> {
        let key = keys::remote(jobid);
        match self.store.get(&key).await? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save_remote(&self, remote: &RemoteJob) -> Result<(), EngineError> {
        let key = keys::remote(&remote.jobid);
        self.store.set(&key, &encode(remote)).await?;
        Ok(())
    }

    pub async fn delete_remote(&self, jobid: &JobId) -> Result<(), EngineError> {
        self.store.del(&keys::remote(jobid)).await?;
        Ok(())
    }

    // Queue indices. `new` is shared; `submitted`/`running` belong to
    // one backend each.

    /// Append to the shared new queue unless already present, so a
    /// redelivered `job_created` cannot double-queue a job.
    pub async fn push_new(&self, jobid: &JobId) -> Result<bool, EngineError> {
        let queued = self.store.lrange(keys::NEW_QUEUE).await?;
        if queued.iter().any(|id| jobid == id.as_str()) {
            return Ok(false);
        }
        self.store.rpush(keys::NEW_QUEUE, jobid.as_str()).await?;
        Ok(true)
    }

    pub async fn pop_new(&self) -> Result<Option<JobId>, EngineError> {
        Ok(self.store.lpop(keys::NEW_QUEUE).await?.map(JobId::new))
    }

    pub async fn remove_new(&self, jobid: &JobId) -> Result<usize, EngineError> {
        Ok(self.store.lrem(keys::NEW_QUEUE, jobid.as_str()).await?)
    }

    pub async fn push_submitted(&self, q: &str, jobid: &JobId) -> Result<(), EngineError> {
        self.store.rpush(&keys::submitted(q), jobid.as_str()).await?;
        Ok(())
    }

    pub async fn remove_submitted(&self, q: &str, jobid: &JobId) -> Result<usize, EngineError> {
        Ok(self.store.lrem(&keys::submitted(q), jobid.as_str()).await?)
    }

    pub async fn list_submitted(&self, q: &str) -> Result<Vec<JobId>, EngineError> {
        Ok(self
            .store
            .lrange(&keys::submitted(q))
            .await?
            .into_iter()
            .map(JobId::new)
            .collect())
    }

    pub async fn push_running(&self, q: &str, jobid: &JobId) -> Result<(), EngineError> {
        self.store.rpush(&keys::running(q), jobid.as_str()).await?;
        Ok(())
    }

    pub async fn remove_running(&self, q: &str, jobid: &JobId) -> Result<usize, EngineError> {
        Ok(self.store.lrem(&keys::running(q), jobid.as_str()).await?)
    }

    pub async fn list_running(&self, q: &str) -> Result<Vec<JobId>, EngineError> {
        Ok(self
            .store
            .lrange(&keys::running(q))
            .await?
            .into_iter()
            .map(JobId::new)
            .collect())
    }
}

/// Status mutation shared by the CAS paths. Clears `backend_id` on the
/// terminal transition so the backend binding and the remote record
/// disappear together.
fn apply_status(record: &mut JobRecord, status: JobStatus, error: Option<&str>) -> bool {
    if record.status == status || !record.status.can_transition_to(status) {
        return false;
    }
    record.status = status;
    record.error = error.map(str::to_string);
    if status.is_terminal() {
        record.backend_id = None;
    }
    true
}

fn encode<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;

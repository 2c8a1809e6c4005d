// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store and bus for tests and single-process use.

use crate::bus::{Delivery, MessageBus, Subscription};
use crate::error::{BusError, StoreError};
use crate::store::StateStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use qc_core::{EventKind, JobEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct MemoryInner {
    strings: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// Store holding everything behind one mutex. Check-and-set compares
/// values directly, which gives the same conflict semantics the Redis
/// WATCH/MULTI/EXEC path provides.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.lock().strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.strings.remove(key);
        inner.lists.remove(key);
        inner.hashes.remove(key);
        Ok(())
    }

    async fn set_if_unchanged(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if inner.strings.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let Some(list) = inner.lists.get_mut(key) else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|v| v != value);
        Ok(before - list.len())
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .lists
            .get(key)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .hashes
            .get(key)
            .and_then(|h| h.get(field).cloned()))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }
}

struct MemoryQueue {
    kinds: Vec<EventKind>,
    tx: tokio::sync::mpsc::UnboundedSender<Delivery>,
}

/// Bus fanning deliveries out to every queue bound to the routing key.
///
/// As on a real broker, events published before any queue is bound are
/// dropped; bound queues buffer without limit. Acks are no-ops, so tests
/// exercise redelivery by publishing an event twice.
#[derive(Default, Clone)]
pub struct MemoryBus {
    queues: Arc<Mutex<Vec<MemoryQueue>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, event: &JobEvent) -> Result<(), BusError> {
        let body = event.encode();
        let mut queues = self.queues.lock();
        queues.retain(|q| !q.tx.is_closed());
        for queue in queues.iter() {
            if queue.kinds.contains(&event.kind) {
                let delivery =
                    Delivery::new(event.kind.routing_key().to_string(), body.clone(), None);
                let _ = queue.tx.send(delivery);
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        _queue: &str,
        kinds: &[EventKind],
    ) -> Result<Subscription, BusError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.queues.lock().push(MemoryQueue { kinds: kinds.to_vec(), tx });
        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

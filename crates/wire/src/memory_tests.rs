// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use qc_core::JobId;

#[tokio::test]
async fn get_set_del() {
    let store = MemoryStore::new();
    assert_eq!(store.get("k").await.unwrap(), None);
    store.set("k", "v").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    store.del("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn cas_applies_when_value_matches() {
    let store = MemoryStore::new();
    store.set("k", "a").await.unwrap();
    assert!(store.set_if_unchanged("k", Some("a"), "b").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), Some("b".to_string()));
}

#[tokio::test]
async fn cas_refuses_on_conflict() {
    let store = MemoryStore::new();
    store.set("k", "changed").await.unwrap();
    assert!(!store.set_if_unchanged("k", Some("a"), "b").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), Some("changed".to_string()));
}

#[tokio::test]
async fn cas_creates_when_absent_expected() {
    let store = MemoryStore::new();
    assert!(store.set_if_unchanged("k", None, "v").await.unwrap());
    assert!(!store.set_if_unchanged("k", None, "w").await.unwrap());
}

#[tokio::test]
async fn list_ops_are_fifo() {
    let store = MemoryStore::new();
    store.rpush("q", "a").await.unwrap();
    store.rpush("q", "b").await.unwrap();
    store.rpush("q", "c").await.unwrap();

    assert_eq!(
        store.lrange("q").await.unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert_eq!(store.lpop("q").await.unwrap(), Some("a".to_string()));
    assert_eq!(store.lrem("q", "c").await.unwrap(), 1);
    assert_eq!(store.lrange("q").await.unwrap(), vec!["b".to_string()]);
}

#[tokio::test]
async fn lpop_on_empty_returns_none() {
    let store = MemoryStore::new();
    assert_eq!(store.lpop("empty").await.unwrap(), None);
}

#[tokio::test]
async fn lrem_removes_all_occurrences() {
    let store = MemoryStore::new();
    for v in ["x", "y", "x", "x"] {
        store.rpush("q", v).await.unwrap();
    }
    assert_eq!(store.lrem("q", "x").await.unwrap(), 3);
    assert_eq!(store.lrem("q", "x").await.unwrap(), 0);
}

#[tokio::test]
async fn hash_ops() {
    let store = MemoryStore::new();
    assert_eq!(store.hget("user:a", "id").await.unwrap(), None);
    store.hset("user:a", "id", "42").await.unwrap();
    assert_eq!(store.hget("user:a", "id").await.unwrap(), Some("42".to_string()));
}

#[tokio::test]
async fn bus_routes_by_kind() {
    let bus = MemoryBus::new();
    let mut created_only = bus.subscribe("created", &[EventKind::Created]).await.unwrap();
    let mut all = bus.subscribe("all", &EventKind::ALL).await.unwrap();

    bus.publish(&JobEvent::new(EventKind::Created, JobId::new("j1"))).await.unwrap();
    bus.publish(&JobEvent::new(EventKind::Started, JobId::new("j1"))).await.unwrap();

    let d = created_only.next().await.unwrap();
    assert_eq!(d.kind(), Some(EventKind::Created));
    d.ack().await.unwrap();

    assert_eq!(all.next().await.unwrap().kind(), Some(EventKind::Created));
    assert_eq!(all.next().await.unwrap().kind(), Some(EventKind::Started));
}

#[tokio::test]
async fn bus_drops_events_with_no_bound_queue() {
    let bus = MemoryBus::new();
    bus.publish(&JobEvent::new(EventKind::Created, JobId::new("lost"))).await.unwrap();

    let mut sub = bus.subscribe("late", &EventKind::ALL).await.unwrap();
    bus.publish(&JobEvent::new(EventKind::Started, JobId::new("seen"))).await.unwrap();

    let d = sub.next().await.unwrap();
    let event = JobEvent::decode(d.kind().unwrap(), &d.body).unwrap();
    assert_eq!(event.jobid, JobId::new("seen"));
}

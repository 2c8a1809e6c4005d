// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The keyed, durable state store shared by every component.

use crate::error::StoreError;
use async_trait::async_trait;

/// Keyed store with atomic list operations and an optimistic
/// check-and-set primitive.
///
/// `set_if_unchanged` is the transaction seam: callers read a value,
/// compute a replacement, and write it back only if the key still holds
/// what they read, retrying on conflict.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Write `value` only if the key currently holds `expected`
    /// (`None` = key absent). Returns whether the write was applied.
    async fn set_if_unchanged(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError>;

    /// Append to the tail of the list at `key`.
    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Pop from the head of the list at `key`; `None` when empty.
    async fn lpop(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove every occurrence of `value` from the list; returns the
    /// number removed.
    async fn lrem(&self, key: &str, value: &str) -> Result<usize, StoreError>;

    /// The whole list at `key`, head first.
    async fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
}

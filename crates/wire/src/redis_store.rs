// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed state store.

use crate::error::StoreError;
use crate::store::StateStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Store backed by a Redis server.
///
/// Plain operations share a multiplexed [`ConnectionManager`].
/// `set_if_unchanged` opens a dedicated connection per call because
/// `WATCH` is connection-scoped and must not interleave with other
/// commands.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        tracing::info!(url, "connected to state store");
        Ok(Self { client, manager })
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.set(key, value).await?)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.del(key).await?)
    }

    async fn set_if_unchanged(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _: () = redis::cmd("WATCH").arg(key).query_async(&mut conn).await?;
        let current: Option<String> = conn.get(key).await?;
        if current.as_deref() != expected {
            let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
            return Ok(false);
        }

        // EXEC aborts (nil reply) if the watched key changed underneath us.
        let mut pipe = redis::pipe();
        pipe.atomic().set(key, value).ignore();
        let applied: Option<()> = pipe.query_async(&mut conn).await?;
        Ok(applied.is_some())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.rpush(key, value).await?)
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.lpop(key, None).await?)
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.lrem(key, 0, value).await?)
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.lrange(key, 0, -1).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.hget(key, field).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.hset(key, field, value).await?)
    }
}

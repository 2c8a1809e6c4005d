// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qc-wire: bindings from the abstract store/bus contracts to Redis and AMQP.
//!
//! All cross-process state flows through these two interfaces. The engine
//! crates consume only the traits; binaries pick the Redis/AMQP
//! implementations, tests pick the in-memory ones.

pub mod amqp;
pub mod bus;
pub mod error;
pub mod keys;
pub mod redis_store;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use amqp::AmqpBus;
pub use bus::{Delivery, MessageBus, Subscription};
pub use error::{BusError, StoreError};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBus, MemoryStore};
pub use redis_store::RedisStore;
pub use store::StateStore;

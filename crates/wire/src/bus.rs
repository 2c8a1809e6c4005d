// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-event bus: topic exchange, routing keys, manual acks.

use crate::error::BusError;
use async_trait::async_trait;
use qc_core::{EventKind, JobEvent};

/// Publish/consume interface over the `aimm.jobqueue` exchange.
///
/// Delivery is at-least-once: consumers acknowledge manually and must
/// tolerate redelivery. Ordering holds per routing key and queue only.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish an event under its kind's routing key.
    async fn publish(&self, event: &JobEvent) -> Result<(), BusError>;

    /// Bind a durable queue named `queue` to the given kinds and start
    /// consuming.
    async fn subscribe(&self, queue: &str, kinds: &[EventKind])
        -> Result<Subscription, BusError>;
}

/// One consumed message, pending acknowledgement.
pub struct Delivery {
    pub routing_key: String,
    pub body: Vec<u8>,
    acker: Option<Box<dyn Acker>>,
}

impl Delivery {
    pub(crate) fn new(routing_key: String, body: Vec<u8>, acker: Option<Box<dyn Acker>>) -> Self {
        Self { routing_key, body, acker }
    }

    /// The event kind, when the routing key is one of ours.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_routing_key(&self.routing_key)
    }

    /// Acknowledge the delivery. Unacked deliveries may be redelivered.
    pub async fn ack(mut self) -> Result<(), BusError> {
        match self.acker.take() {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("routing_key", &self.routing_key)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[async_trait]
pub(crate) trait Acker: Send {
    async fn ack(self: Box<Self>) -> Result<(), BusError>;
}

/// Stream of deliveries for one bound queue.
pub struct Subscription {
    rx: tokio::sync::mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub(crate) fn new(rx: tokio::sync::mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { rx }
    }

    /// Next delivery; `None` once the underlying connection is gone.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AMQP-backed message bus.

use crate::bus::{Acker, Delivery, MessageBus, Subscription};
use crate::error::BusError;
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use qc_core::event::EXCHANGE;
use qc_core::{EventKind, JobEvent};

/// Bus backed by an AMQP broker.
///
/// Publishes on a direct exchange; each subscriber gets one durable
/// queue bound once per routing key, with manual acknowledgement.
#[derive(Clone)]
pub struct AmqpBus {
    channel: Channel,
}

impl AmqpBus {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .exchange_declare(
                EXCHANGE,
                ExchangeKind::Direct,
                ExchangeDeclareOptions::default(),
                FieldTable::default(),
            )
            .await?;
        tracing::info!(url, exchange = EXCHANGE, "connected to message bus");
        Ok(Self { channel })
    }
}

#[async_trait]
impl MessageBus for AmqpBus {
    async fn publish(&self, event: &JobEvent) -> Result<(), BusError> {
        self.channel
            .basic_publish(
                EXCHANGE,
                event.kind.routing_key(),
                BasicPublishOptions::default(),
                &event.encode(),
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        kinds: &[EventKind],
    ) -> Result<Subscription, BusError> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        for kind in kinds {
            self.channel
                .queue_bind(
                    queue,
                    EXCHANGE,
                    kind.routing_key(),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        let mut consumer = self
            .channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(next) = consumer.next().await {
                match next {
                    Ok(delivery) => {
                        let out = Delivery::new(
                            delivery.routing_key.to_string(),
                            delivery.data,
                            Some(Box::new(AmqpAcker { acker: delivery.acker })),
                        );
                        if tx.send(out).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "bus consumer error, stopping");
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(rx))
    }
}

struct AmqpAcker {
    acker: lapin::acker::Acker,
}

#[async_trait]
impl Acker for AmqpAcker {
    async fn ack(self: Box<Self>) -> Result<(), BusError> {
        self.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }
}

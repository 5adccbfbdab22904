//! Simulated broker channel.
//!
//! `SimChannel` implements [`Channel`] over an in-memory [`RoutingTable`].
//!
//! # Blocking contract
//!
//! Publishing fans a message out to every queue bound to the exchange, one
//! queue at a time in declaration order, and waits at each queue until a
//! reader takes the delivery. A bound queue nobody reads therefore stalls the
//! publish, and every queue declared after it, indefinitely. Tests use this to
//! synchronize publisher and consumer; [`SimChannel::publish_timeout`] bounds
//! the wait when that is not wanted.
//!
//! # Synchronization
//!
//! The routing table sits behind a mutex held only for the lookup part of
//! each operation, never across a blocking send. Declaring or binding while a
//! publish is blocked is safe, but the in-flight publish keeps the routing it
//! resolved when it started.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use relay_broker::{
    BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, BrokerError, Channel, Delivery,
    DeliverySender, DeliveryStream, FieldTable, Publishing, QueueBindOptions, QueueDeclareOptions,
    QueueInfo, SendTimeoutError,
};

use crate::routing::{RoutingTable, SimQueue};

/// In-memory channel with exchange-name routing and rendezvous deliveries.
#[derive(Debug, Default)]
pub struct SimChannel {
    table: Mutex<RoutingTable>,
}

impl SimChannel {
    /// Channel with no queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every queue in declaration order.
    ///
    /// Unlike `basic_consume`, this reaches every queue sharing a name, so a
    /// harness can read the streams of later duplicates.
    pub fn queues(&self) -> Vec<SimQueue> {
        self.table().queues().to_vec()
    }

    /// Number of declared queues, duplicates included.
    pub fn queue_count(&self) -> usize {
        self.table().len()
    }

    /// Publish with a per-queue bound on the wait for a reader.
    ///
    /// Routing and ordering match `basic_publish`. When a queue's reader does
    /// not take the delivery within `timeout`, the offer is withdrawn and
    /// [`BrokerError::PublishTimeout`] names that queue. Queues earlier in the
    /// routing order keep what they received; later ones receive nothing.
    pub async fn publish_timeout(
        &self,
        exchange: &str,
        routing_key: &str,
        _options: BasicPublishOptions,
        message: Publishing,
        timeout: Duration,
    ) -> Result<(), BrokerError> {
        for (queue, sender) in self.route(exchange) {
            let delivery = build_delivery(exchange, routing_key, &message);

            match sender.send_timeout(delivery, timeout).await {
                Ok(()) => {},
                Err(SendTimeoutError::Elapsed(_)) => {
                    tracing::debug!("Publish to {} timed out on queue {}", exchange, queue);
                    return Err(BrokerError::PublishTimeout {
                        exchange: exchange.to_string(),
                        queue,
                        timeout,
                    });
                },
                Err(SendTimeoutError::Closed) => return Err(BrokerError::StreamClosed),
            }
        }

        Ok(())
    }

    fn table(&self) -> MutexGuard<'_, RoutingTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the queues `exchange` reaches, releasing the lock before any
    /// send.
    fn route(&self, exchange: &str) -> Vec<(String, DeliverySender)> {
        let table = self.table();
        let routed: Vec<_> =
            table.route(exchange).map(|q| (q.name().to_string(), q.sender().clone())).collect();

        if routed.is_empty() {
            tracing::trace!("No queue bound to exchange {}", exchange);
        }

        routed
    }
}

fn build_delivery(exchange: &str, routing_key: &str, message: &Publishing) -> Delivery {
    Delivery::new(exchange, routing_key, message.body.clone(), message.content_type.clone())
}

#[async_trait]
impl Channel for SimChannel {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        _options: BasicPublishOptions,
        message: Publishing,
    ) -> Result<(), BrokerError> {
        for (queue, sender) in self.route(exchange) {
            tracing::trace!("Offering {}/{} to queue {}", exchange, routing_key, queue);
            sender.send(build_delivery(exchange, routing_key, &message)).await?;
        }

        Ok(())
    }

    async fn queue_declare(
        &self,
        name: &str,
        _options: QueueDeclareOptions,
        _arguments: FieldTable,
    ) -> Result<QueueInfo, BrokerError> {
        let mut table = self.table();
        let info = table.declare(name);

        tracing::debug!("Declared queue {} ({} queues total)", name, table.len());

        Ok(info)
    }

    async fn queue_bind(
        &self,
        queue: &str,
        routing_key: &str,
        exchange: &str,
        _options: QueueBindOptions,
        _arguments: FieldTable,
    ) -> Result<(), BrokerError> {
        let bound = self.table().bind(queue, routing_key, exchange);

        if bound == 0 {
            tracing::debug!("Bind of undeclared queue {} to {} ignored", queue, exchange);
        } else {
            tracing::debug!("Bound {} queue(s) named {} to {} under {}", bound, queue, exchange, routing_key);
        }

        Ok(())
    }

    async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        _options: BasicConsumeOptions,
        _arguments: FieldTable,
    ) -> Result<DeliveryStream, BrokerError> {
        match self.table().find(queue) {
            Some(found) => {
                tracing::debug!("Consumer {} attached to queue {}", consumer_tag, queue);
                Ok(found.deliveries())
            },
            None => {
                tracing::warn!("Consume on undeclared queue {}", queue);
                Err(BrokerError::QueueNotFound { queue: queue.to_string() })
            },
        }
    }

    async fn basic_cancel(
        &self,
        _consumer_tag: &str,
        _options: BasicCancelOptions,
    ) -> Result<(), BrokerError> {
        Ok(())
    }
}

//! Broker capability traits.
//!
//! These traits decouple the relay from the broker it talks to. Production
//! code hands the pipeline a dialer backed by a real client; tests hand it the
//! in-process simulator. The pipeline only ever sees these traits, so test
//! code never branches on transport type.
//!
//! # Invariants
//!
//! - A `Connection` exposes a single logical `Channel`: every call to
//!   [`Connection::channel`] returns the same instance.
//! - [`Channel::basic_publish`] completes only once every routed delivery has
//!   been taken by a reader (see [`crate::delivery`]).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    delivery::{DeliveryStream, Publishing},
    error::BrokerError,
    options::{
        BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, FieldTable, QueueBindOptions,
        QueueDeclareOptions, QueueInfo,
    },
};

/// Sink for connection-closed notifications.
///
/// Implementations push a [`BrokerError::ConnectionClosed`] when the broker
/// drops the connection.
pub type CloseListener = mpsc::Sender<BrokerError>;

/// Produces connections to a broker.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connection type handed out by this dialer.
    type Connection: Connection;

    /// Connect over plain TCP.
    async fn dial(&self, address: &str) -> Result<Arc<Self::Connection>, BrokerError>;

    /// Connect over TLS.
    async fn dial_tls(
        &self,
        address: &str,
        tls: Arc<rustls::ClientConfig>,
    ) -> Result<Arc<Self::Connection>, BrokerError>;
}

/// An open broker connection.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Channel type multiplexed over this connection.
    type Channel: Channel;

    /// The connection's channel, opened on first request.
    async fn channel(&self) -> Result<Arc<Self::Channel>, BrokerError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), BrokerError>;

    /// Register a listener for close events and hand it back.
    fn notify_close(&self, listener: CloseListener) -> CloseListener;
}

/// Queue topology and message flow over one connection.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Publish a message to an exchange.
    ///
    /// Suspends until every queue the message is routed to has handed it to a
    /// reader.
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        message: Publishing,
    ) -> Result<(), BrokerError>;

    /// Declare a queue.
    async fn queue_declare(
        &self,
        name: &str,
        options: QueueDeclareOptions,
        arguments: FieldTable,
    ) -> Result<QueueInfo, BrokerError>;

    /// Bind a queue to an exchange under a routing key.
    async fn queue_bind(
        &self,
        queue: &str,
        routing_key: &str,
        exchange: &str,
        options: QueueBindOptions,
        arguments: FieldTable,
    ) -> Result<(), BrokerError>;

    /// Start consuming a queue.
    async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
        arguments: FieldTable,
    ) -> Result<DeliveryStream, BrokerError>;

    /// Stop a consumer.
    async fn basic_cancel(
        &self,
        consumer_tag: &str,
        options: BasicCancelOptions,
    ) -> Result<(), BrokerError>;
}

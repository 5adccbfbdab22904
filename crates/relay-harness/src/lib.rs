//! In-process broker simulator for relay pipeline testing.
//!
//! The relay normally dials a remote broker, declares queues, binds them to
//! exchanges and consumes deliveries. This crate implements the same
//! capability traits (`Dialer`, `Connection`, `Channel`) entirely in memory so
//! the pipeline can be exercised deterministically, with no network and no
//! broker process.
//!
//! # Semantics
//!
//! - Declaring a queue name twice creates two queues; lookups pick the first.
//! - Routing is by exchange name only: the routing key is stored on bindings
//!   but never matched.
//! - Delivery streams have zero capacity. A publish waits at each bound queue,
//!   in declaration order, until a reader takes the delivery.
//! - One dialer hands out one connection, which owns one channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_broker::{Channel, Connection, Dialer, Publishing};
//! use relay_harness::SimDialer;
//!
//! let dialer = SimDialer::default();
//! let channel = dialer.dial("amqp://localhost").await?.channel().await?;
//!
//! channel.queue_declare("events", Default::default(), Default::default()).await?;
//! channel.queue_bind("events", "#", "ingress", Default::default(), Default::default()).await?;
//! let deliveries = channel.basic_consume("events", "tag", Default::default(), Default::default()).await?;
//!
//! let reader = tokio::spawn(async move { deliveries.recv().await });
//! channel.basic_publish("ingress", "any", Default::default(), Publishing::new("hello")).await?;
//! ```
//!
//! # Model-Based Testing
//!
//! The `model` module holds a plain-data reference of the routing rules.
//! Operations are applied to both the model and the simulator, and their
//! observable outcomes compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod routing;
mod sim_channel;
mod sim_connection;

pub use model::{ModelBroker, ModelQueue, Operation, OperationResult, SmallPayload};
pub use routing::{RoutingTable, SimQueue};
pub use sim_channel::SimChannel;
pub use sim_connection::{DEFAULT_URL, SimConnection, SimDialer};

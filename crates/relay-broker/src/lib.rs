//! Broker capabilities for the event relay pipeline.
//!
//! The relay consumes events from a topic-routing message broker: it dials the
//! broker, declares queues, binds them to exchanges and reads deliveries. This
//! crate defines that surface as a set of capability traits so the pipeline
//! can run against a production client or an in-process simulator without
//! branching on which one it holds.
//!
//! ## Architecture
//!
//! ```text
//! relay-broker
//!   ├─ Dialer          (address → Connection, plain or TLS)
//!   ├─ Connection      (one Channel, close, close notification)
//!   ├─ Channel         (declare, bind, publish, consume, cancel)
//!   ├─ DeliveryStream  (zero-capacity rendezvous between publisher and reader)
//!   └─ Topology        (declarative queues + bindings, installable on a Channel)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod delivery;
mod error;
pub mod options;
pub mod topology;

pub use capability::{Channel, CloseListener, Connection, Dialer};
pub use delivery::{
    Delivery, DeliverySender, DeliveryStream, Publishing, SendTimeoutError, StreamClosed,
};
pub use error::BrokerError;
pub use options::{
    BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, FieldTable, FieldValue,
    QueueBindOptions, QueueDeclareOptions, QueueInfo,
};
pub use topology::{BindingSpec, Topology};

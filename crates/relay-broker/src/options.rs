//! Option flags and descriptors shared by every broker implementation.
//!
//! The flags mirror the wire protocol's method arguments. Production clients
//! forward them to the broker; the simulator accepts and ignores them.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Value stored in a [`FieldTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// UTF-8 string.
    Str(String),
    /// Opaque bytes.
    Bytes(Bytes),
}

/// Extra method arguments (`x-message-ttl`, `x-dead-letter-exchange`, ...).
pub type FieldTable = BTreeMap<String, FieldValue>;

/// Flags for `queue.declare`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDeclareOptions {
    /// Queue survives a broker restart.
    pub durable: bool,
    /// Queue is deleted once its last consumer goes away.
    pub auto_delete: bool,
    /// Queue is private to the declaring connection.
    pub exclusive: bool,
    /// Do not wait for the broker's confirmation.
    pub no_wait: bool,
}

/// Flags for `queue.bind`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueBindOptions {
    /// Do not wait for the broker's confirmation.
    pub no_wait: bool,
}

/// Flags for `basic.publish`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicPublishOptions {
    /// Return the message if it cannot be routed.
    pub mandatory: bool,
    /// Return the message if it cannot be delivered immediately.
    pub immediate: bool,
}

/// Flags for `basic.consume`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConsumeOptions {
    /// Deliveries are considered acknowledged on send.
    pub no_ack: bool,
    /// Only this consumer may read the queue.
    pub exclusive: bool,
    /// Do not receive messages published on this connection.
    pub no_local: bool,
    /// Do not wait for the broker's confirmation.
    pub no_wait: bool,
}

/// Flags for `basic.cancel`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicCancelOptions {
    /// Do not wait for the broker's confirmation.
    pub no_wait: bool,
}

/// Queue descriptor returned by `queue.declare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    /// Declared queue name.
    pub name: String,
    /// Messages ready in the queue.
    pub messages: u32,
    /// Active consumers on the queue.
    pub consumers: u32,
}

impl QueueInfo {
    /// Descriptor for a freshly declared, empty queue.
    pub fn empty(name: impl Into<String>) -> Self {
        Self { name: name.into(), messages: 0, consumers: 0 }
    }
}

//! Operations for model-based testing.
//!
//! Operations are generated randomly (by proptest or a fuzzer) and applied to
//! both the model and the simulator. Identifiers are small integers mapped
//! onto a handful of names so that collisions, duplicate declarations and
//! repeated binds come up often.

use arbitrary::Arbitrary;

/// Queue identifier, mapped onto [`QUEUE_NAMES`].
pub type ModelQueueId = u8;

/// Exchange identifier, mapped onto [`EXCHANGE_NAMES`].
pub type ModelExchangeId = u8;

/// Routing key identifier, mapped onto [`ROUTING_KEYS`].
pub type ModelKeyId = u8;

const QUEUE_NAMES: [&str; 4] = ["events", "alerts", "audit", "feed"];
const EXCHANGE_NAMES: [&str; 3] = ["ingress", "egress", "control"];
const ROUTING_KEYS: [&str; 3] = ["events", "other", "#"];

/// Queue name for an identifier.
pub fn queue_name(id: ModelQueueId) -> &'static str {
    QUEUE_NAMES[usize::from(id) % QUEUE_NAMES.len()]
}

/// Exchange name for an identifier.
pub fn exchange_name(id: ModelExchangeId) -> &'static str {
    EXCHANGE_NAMES[usize::from(id) % EXCHANGE_NAMES.len()]
}

/// Routing key for an identifier.
pub fn routing_key(id: ModelKeyId) -> &'static str {
    ROUTING_KEYS[usize::from(id) % ROUTING_KEYS.len()]
}

/// Operations that can be applied to a broker channel.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Declare a queue.
    Declare {
        /// Queue to declare.
        queue: ModelQueueId,
    },

    /// Bind a queue to an exchange.
    Bind {
        /// Queue to bind.
        queue: ModelQueueId,
        /// Exchange to bind to.
        exchange: ModelExchangeId,
        /// Routing key recorded on the binding.
        key: ModelKeyId,
    },

    /// Publish a message.
    Publish {
        /// Exchange to publish to.
        exchange: ModelExchangeId,
        /// Routing key to publish with.
        key: ModelKeyId,
        /// Message content.
        payload: SmallPayload,
    },

    /// Look up a queue's delivery stream.
    Consume {
        /// Queue to consume.
        queue: ModelQueueId,
    },
}

/// Compact payload description, expanded deterministically.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallPayload {
    /// Content seed.
    pub seed: u8,
    /// Length class (0-3 maps to empty/small/medium/large).
    pub size_class: u8,
}

impl SmallPayload {
    /// Expand to payload bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len: u8 = match self.size_class % 4 {
            0 => 0,
            1 => 8,
            2 => 64,
            _ => 255,
        };

        (0..len).map(|i| self.seed.wrapping_add(i)).collect()
    }
}

/// Observable outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Queue appended at this position.
    Declared {
        /// Position in declaration order.
        index: usize,
    },

    /// Binding recorded on this many queues.
    Bound {
        /// Queues sharing the bound name.
        queues: usize,
    },

    /// Message delivered to these queues.
    Published {
        /// Positions of receiving queues, in delivery order.
        recipients: Vec<usize>,
    },

    /// Stream of the queue at this position returned.
    Consumed {
        /// Position of the first queue with the name.
        index: usize,
    },

    /// No queue with the name exists.
    NotFound,
}

impl OperationResult {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

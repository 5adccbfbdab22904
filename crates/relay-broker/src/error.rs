//! Broker error types.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by broker capabilities.
///
/// The simulator only ever produces [`BrokerError::QueueNotFound`] and, for
/// bounded publishes, [`BrokerError::PublishTimeout`]. The remaining variants
/// exist for production clients and for harnesses that inject failures from
/// outside (for example by pushing a [`BrokerError::ConnectionClosed`] onto a
/// close listener).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// No declared queue carries the requested name.
    #[error("queue not found: {queue}")]
    QueueNotFound {
        /// Name that was looked up.
        queue: String,
    },

    /// A bounded publish gave up waiting for a reader.
    #[error("publish to exchange '{exchange}' timed out after {timeout:?} waiting on queue '{queue}'")]
    PublishTimeout {
        /// Exchange the message was published to.
        exchange: String,
        /// Queue whose reader never took the delivery.
        queue: String,
        /// Per-queue wait bound.
        timeout: Duration,
    },

    /// The broker closed the connection.
    #[error("connection closed ({code}): {reason}")]
    ConnectionClosed {
        /// Broker reply code.
        code: u16,
        /// Broker-supplied reason text.
        reason: String,
    },

    /// Every reader of a delivery stream is gone.
    #[error("delivery stream closed")]
    StreamClosed,

    /// Transport failure in a production client.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BrokerError {
    /// Returns true if the connection is unusable after this error.
    ///
    /// Fatal errors require redialing. Transient errors leave the connection
    /// intact and the operation may be retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ConnectionClosed { .. } | Self::StreamClosed | Self::Transport(_) => true,

            Self::QueueNotFound { .. } | Self::PublishTimeout { .. } => false,
        }
    }
}

impl From<crate::delivery::StreamClosed> for BrokerError {
    fn from(_: crate::delivery::StreamClosed) -> Self {
        Self::StreamClosed
    }
}

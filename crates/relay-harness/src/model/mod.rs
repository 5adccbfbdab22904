//! Reference model for model-based testing.
//!
//! The model captures the routing rules of the simulated broker as plain data
//! with no streams and no concurrency. It is the oracle the simulator is
//! checked against: operation sequences are applied to both and their
//! observable outcomes compared.

mod broker;
pub mod operation;

pub use broker::{ModelBroker, ModelQueue};
pub use operation::{
    ModelExchangeId, ModelKeyId, ModelQueueId, Operation, OperationResult, SmallPayload,
    exchange_name, queue_name, routing_key,
};

//! Declarative queue topology.
//!
//! The relay builds its topology once at startup: a fixed set of queues, each
//! bound to one or more exchanges. `Topology` captures that set so it can be
//! installed on any [`Channel`], real or simulated.

use crate::{
    capability::Channel,
    error::BrokerError,
    options::{FieldTable, QueueBindOptions, QueueDeclareOptions, QueueInfo},
};

/// One queue-to-exchange binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSpec {
    /// Queue to bind.
    pub queue: String,
    /// Exchange the queue receives from.
    pub exchange: String,
    /// Routing key recorded for the binding.
    pub routing_key: String,
}

/// Queues and bindings to install on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    queues: Vec<String>,
    bindings: Vec<BindingSpec>,
}

impl Topology {
    /// Empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a queue declaration.
    #[must_use]
    pub fn queue(mut self, name: impl Into<String>) -> Self {
        self.queues.push(name.into());
        self
    }

    /// Add a binding.
    #[must_use]
    pub fn bind(
        mut self,
        queue: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        self.bindings.push(BindingSpec {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        });
        self
    }

    /// Queue names in declaration order.
    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    /// Bindings in installation order.
    pub fn bindings(&self) -> &[BindingSpec] {
        &self.bindings
    }

    /// Declare every queue, then apply every binding.
    ///
    /// Queues are declared before any binding so a binding listed ahead of its
    /// queue still takes effect.
    pub async fn install<C>(&self, channel: &C) -> Result<Vec<QueueInfo>, BrokerError>
    where
        C: Channel + ?Sized,
    {
        let mut declared = Vec::with_capacity(self.queues.len());

        for name in &self.queues {
            let info =
                channel.queue_declare(name, QueueDeclareOptions::default(), FieldTable::new()).await?;
            declared.push(info);
        }

        for binding in &self.bindings {
            channel
                .queue_bind(
                    &binding.queue,
                    &binding.routing_key,
                    &binding.exchange,
                    QueueBindOptions::default(),
                    FieldTable::new(),
                )
                .await?;
        }

        tracing::debug!(
            "Installed topology: {} queues, {} bindings",
            self.queues.len(),
            self.bindings.len()
        );

        Ok(declared)
    }
}

//! Model broker: the routing table as plain data.

use std::collections::BTreeMap;

use super::operation::{Operation, OperationResult, exchange_name, queue_name, routing_key};

/// A queue in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelQueue {
    /// Queue name.
    pub name: String,
    /// Exchange name → routing keys in bind order.
    pub bindings: BTreeMap<String, Vec<String>>,
}

/// Model of one channel's routing table.
#[derive(Debug, Clone, Default)]
pub struct ModelBroker {
    queues: Vec<ModelQueue>,
    /// Payloads received per queue position.
    received: Vec<Vec<Vec<u8>>>,
}

impl ModelBroker {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues in declaration order.
    pub fn queues(&self) -> &[ModelQueue] {
        &self.queues
    }

    /// Payloads delivered to the queue at `index`, oldest first.
    pub fn received(&self, index: usize) -> &[Vec<u8>] {
        self.received.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Positions of queues a publish to `exchange` reaches.
    pub fn recipients(&self, exchange: &str) -> Vec<usize> {
        self.queues
            .iter()
            .enumerate()
            .filter(|(_, q)| q.bindings.contains_key(exchange))
            .map(|(i, _)| i)
            .collect()
    }

    /// Position of the first queue named `name`.
    pub fn first(&self, name: &str) -> Option<usize> {
        self.queues.iter().position(|q| q.name == name)
    }

    /// Apply an operation and return its outcome.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Declare { queue } => {
                self.queues
                    .push(ModelQueue { name: queue_name(*queue).to_string(), bindings: BTreeMap::new() });
                self.received.push(Vec::new());
                OperationResult::Declared { index: self.queues.len() - 1 }
            },
            Operation::Bind { queue, exchange, key } => {
                let name = queue_name(*queue);
                let mut queues = 0;
                for entry in self.queues.iter_mut().filter(|q| q.name == name) {
                    entry
                        .bindings
                        .entry(exchange_name(*exchange).to_string())
                        .or_default()
                        .push(routing_key(*key).to_string());
                    queues += 1;
                }
                OperationResult::Bound { queues }
            },
            Operation::Publish { exchange, payload, .. } => {
                // Routing key deliberately plays no part in routing.
                let recipients = self.recipients(exchange_name(*exchange));
                for &index in &recipients {
                    self.received[index].push(payload.to_bytes());
                }
                OperationResult::Published { recipients }
            },
            Operation::Consume { queue } => match self.first(queue_name(*queue)) {
                Some(index) => OperationResult::Consumed { index },
                None => OperationResult::NotFound,
            },
        }
    }
}

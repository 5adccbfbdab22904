//! Routing table for the simulated broker.
//!
//! The table is an ordered list of queues, not a map: declaring a name twice
//! yields two distinct queues. Lookups by name pick the first match, binds
//! apply to every match.
//!
//! # Routing policy
//!
//! A message published to exchange `E` reaches every queue that has at least
//! one binding under `E`. The routing key is recorded on each binding but is
//! never compared, so routing behaves like a fanout exchange regardless of the
//! keys used. Real brokers match keys; code that talks to a production broker
//! must not rely on this shortcut.

use std::{collections::BTreeMap, fmt};

use relay_broker::{
    QueueInfo,
    delivery::{self, DeliverySender, DeliveryStream},
};

/// A declared queue.
///
/// Clones share the queue's delivery stream but carry a frozen copy of its
/// bindings.
#[derive(Debug, Clone)]
pub struct SimQueue {
    name: String,
    bound_exchanges: BTreeMap<String, Vec<String>>,
    sender: DeliverySender,
    deliveries: DeliveryStream,
}

impl SimQueue {
    fn new(name: &str) -> Self {
        let (sender, deliveries) = delivery::stream();
        Self { name: name.to_string(), bound_exchanges: BTreeMap::new(), sender, deliveries }
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exchange name → routing keys, in bind order, duplicates included.
    pub fn bound_exchanges(&self) -> &BTreeMap<String, Vec<String>> {
        &self.bound_exchanges
    }

    /// Routing keys bound under `exchange`. `None` if never bound to it.
    pub fn routing_keys(&self, exchange: &str) -> Option<&[String]> {
        self.bound_exchanges.get(exchange).map(Vec::as_slice)
    }

    /// Whether publishes to `exchange` reach this queue.
    pub fn is_bound_to(&self, exchange: &str) -> bool {
        self.bound_exchanges.contains_key(exchange)
    }

    /// Reader handle for this queue's delivery stream.
    pub fn deliveries(&self) -> DeliveryStream {
        self.deliveries.clone()
    }

    pub(crate) fn sender(&self) -> &DeliverySender {
        &self.sender
    }
}

impl fmt::Display for SimQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has exchanges {{", self.name)?;
        for (i, (exchange, keys)) in self.bound_exchanges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{exchange}: [{}]", keys.join(", "))?;
        }
        f.write_str("}")
    }
}

/// Ordered collection of declared queues.
#[derive(Debug, Default)]
pub struct RoutingTable {
    queues: Vec<SimQueue>,
}

impl RoutingTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new queue, even if one with the same name exists.
    pub fn declare(&mut self, name: &str) -> QueueInfo {
        self.queues.push(SimQueue::new(name));
        QueueInfo::empty(name)
    }

    /// Record `routing_key` under `exchange` on every queue named `queue`.
    ///
    /// Returns the number of queues bound. Zero when the queue was never
    /// declared; that is not an error.
    pub fn bind(&mut self, queue: &str, routing_key: &str, exchange: &str) -> usize {
        let mut bound = 0;

        for entry in self.queues.iter_mut().filter(|q| q.name == queue) {
            entry.bound_exchanges.entry(exchange.to_string()).or_default().push(routing_key.to_string());
            bound += 1;
        }

        bound
    }

    /// First queue named `name`.
    pub fn find(&self, name: &str) -> Option<&SimQueue> {
        self.queues.iter().find(|q| q.name == name)
    }

    /// Queues a publish to `exchange` reaches, in declaration order.
    pub fn route<'a>(&'a self, exchange: &'a str) -> impl Iterator<Item = &'a SimQueue> + 'a {
        self.queues.iter().filter(move |q| q.is_bound_to(exchange))
    }

    /// Every queue in declaration order.
    pub fn queues(&self) -> &[SimQueue] {
        &self.queues
    }

    /// Number of declared queues, duplicates included.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether no queue has been declared.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

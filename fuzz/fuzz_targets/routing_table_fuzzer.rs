//! Fuzz target for [`RoutingTable`]
//!
//! Drives the routing table with arbitrary declare/bind/route/find sequences
//! and checks every step against the reference model.
//!
//! # Invariants
//!
//! - Declaring never merges: table length equals declarations so far
//! - Bind touches exactly the queues sharing the name, zero if undeclared
//! - Routing depends on exchange membership only, in declaration order
//! - Lookup by name returns the first declared queue
//! - Bindings (duplicates and order included) match the model
//! - NEVER panic

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_harness::{
    model::{exchange_name, queue_name, routing_key},
    ModelBroker, Operation, OperationResult, RoutingTable,
};

fuzz_target!(|ops: Vec<Operation>| {
    let mut table = RoutingTable::new();
    let mut model = ModelBroker::new();

    for op in &ops {
        let expected = model.apply(op);

        match op {
            Operation::Declare { queue } => {
                let info = table.declare(queue_name(*queue));
                assert_eq!(info.name, queue_name(*queue));
                assert_eq!(expected, OperationResult::Declared { index: table.len() - 1 });
            },
            Operation::Bind { queue, exchange, key } => {
                let queues =
                    table.bind(queue_name(*queue), routing_key(*key), exchange_name(*exchange));
                assert_eq!(expected, OperationResult::Bound { queues });
            },
            Operation::Publish { exchange, .. } => {
                let exchange = exchange_name(*exchange);
                let names: Vec<&str> = table.route(exchange).map(|q| q.name()).collect();
                let recipients: Vec<usize> = table
                    .queues()
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| q.routing_keys(exchange).is_some())
                    .map(|(i, _)| i)
                    .collect();
                assert_eq!(names.len(), recipients.len());
                assert_eq!(expected, OperationResult::Published { recipients });
            },
            Operation::Consume { queue } => {
                let name = queue_name(*queue);
                let actual = match table.find(name) {
                    Some(found) => {
                        let index = table
                            .queues()
                            .iter()
                            .position(|q| std::ptr::eq(q, found))
                            .unwrap_or(usize::MAX);
                        OperationResult::Consumed { index }
                    },
                    None => OperationResult::NotFound,
                };
                assert_eq!(expected, actual);
            },
        }
    }

    assert_eq!(model.queues().len(), table.len());
    for (expected, actual) in model.queues().iter().zip(table.queues()) {
        assert_eq!(expected.name, actual.name());
        assert_eq!(&expected.bindings, actual.bound_exchanges());
    }
});

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Topology Planning
//!
//! For any well-formed topology the plan lists every resource exactly
//! once, in tier order, and applying it twice is the same as applying it
//! once.

use cim_broker_topology::client::InMemoryBroker;
use cim_broker_topology::domain::{
    validate, Binding, Exchange, ExchangeKind, Policy, PolicyTarget, Queue, ResourceKind,
    ResourceRef, Topology,
};
use cim_broker_topology::Applier;
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn exchange_kind() -> impl Strategy<Value = ExchangeKind> {
    prop_oneof![
        Just(ExchangeKind::Topic),
        Just(ExchangeKind::Direct),
        Just(ExchangeKind::Fanout),
    ]
}

/// A valid topology with unique names and resolvable bindings
fn topology() -> impl Strategy<Value = Topology> {
    (
        prop::collection::vec(exchange_kind(), 1..5),
        prop::collection::vec(prop::option::of(1u64..100_000), 1..5),
        prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>(), "[a-z]{1,4}"), 0..8),
        0usize..3,
        any::<bool>(),
    )
        .prop_map(|(exchange_kinds, queue_ttls, bindings, policies, dead_letter)| {
            let mut topology = Topology::new("prop");

            for (i, kind) in exchange_kinds.iter().enumerate() {
                topology = topology.exchange(Exchange::new(format!("ex{i}"), *kind));
            }
            for (i, ttl) in queue_ttls.iter().enumerate() {
                let queue = Queue::new(format!("q{i}"));
                topology = topology.queue(match ttl {
                    Some(ttl) => queue.with_message_ttl_ms(*ttl),
                    None => queue,
                });
            }

            let mut seen = HashSet::new();
            for (source, destination, key) in bindings {
                let binding = Binding::new(
                    format!("ex{}", source.index(exchange_kinds.len())),
                    format!("q{}", destination.index(queue_ttls.len())),
                    key,
                );
                if seen.insert(binding.clone()) {
                    topology = topology.binding(binding);
                }
            }

            for i in 0..policies {
                topology = topology.policy(
                    Policy::new(format!("policy{i}"), format!("^q{i}"), PolicyTarget::Queues)
                        .with("max-length", 10 + i as u64),
                );
            }

            if dead_letter {
                topology = topology
                    .exchange(Exchange::topic("dlx"))
                    .queue(Queue::new("dlq"))
                    .binding(Binding::new("dlx", "dlq", "#"))
                    .dead_letter_target("dlx", "dlq");
            }

            topology
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: generated topologies are valid
    #[test]
    fn prop_generated_topologies_validate(topology in topology()) {
        prop_assert_eq!(validate(&topology), Ok(()));
    }

    /// Property: the plan schedules every resource exactly once
    #[test]
    fn prop_plan_covers_every_resource_once(topology in topology()) {
        let order = topology.plan().order();
        let unique: HashSet<&ResourceRef> = order.iter().collect();

        prop_assert_eq!(order.len(), topology.resource_count());
        prop_assert_eq!(unique.len(), order.len());
    }

    /// Property: resource kinds never go backwards in the plan
    #[test]
    fn prop_plan_is_tiered(topology in topology()) {
        let kinds: Vec<ResourceKind> = topology.plan().order().iter().map(|r| r.kind).collect();
        prop_assert!(kinds.windows(2).all(|pair| pair[0] <= pair[1]));
        prop_assert_eq!(kinds.first(), Some(&ResourceKind::VirtualHost));
    }

    /// Property: planning is deterministic and keeps declaration order within a tier
    #[test]
    fn prop_plan_is_stable(topology in topology()) {
        let order = topology.plan().order();
        prop_assert_eq!(&order, &topology.plan().order());

        let queues: Vec<ResourceRef> = order
            .iter()
            .filter(|r| r.kind == ResourceKind::Queue)
            .cloned()
            .collect();
        let declared: Vec<ResourceRef> = topology.queues.iter().map(Queue::resource_ref).collect();
        prop_assert_eq!(queues, declared);
    }

    /// Property: every binding is declared after both of its ends
    #[test]
    fn prop_bindings_follow_their_ends(topology in topology()) {
        let broker = InMemoryBroker::new();
        let report = tokio_test::block_on(Applier::new(&broker).apply(&topology)).unwrap();
        prop_assert!(report.is_success());

        let calls = broker.ensure_calls();
        let position = |r: &ResourceRef| calls.iter().position(|c| c == r);
        for binding in &topology.bindings {
            let at = position(&binding.resource_ref());
            prop_assert!(at > position(&ResourceRef::exchange(&binding.source_exchange)));
            prop_assert!(at > position(&ResourceRef::queue(&binding.destination_queue)));
        }
    }

    /// Property: applying twice equals applying once
    #[test]
    fn prop_apply_is_idempotent(topology in topology()) {
        let broker = InMemoryBroker::new();
        let applier = Applier::new(&broker);

        let first = tokio_test::block_on(applier.apply(&topology)).unwrap();
        let snapshot = broker.snapshot();
        let second = tokio_test::block_on(applier.apply(&topology)).unwrap();

        prop_assert_eq!(first.created.len(), topology.resource_count());
        prop_assert!(second.created.is_empty());
        prop_assert_eq!(second.applied, first.applied);
        prop_assert_eq!(broker.snapshot(), snapshot);
    }
}

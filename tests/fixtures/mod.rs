// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-broker-topology
//!
//! Deterministic topologies shared by the integration tests. Tests build
//! their topologies here rather than inline, so each scenario reads as a
//! name instead of a page of builder calls.

#![allow(dead_code)]

use cim_broker_topology::domain::{
    Binding, DeadLetter, Exchange, Policy, PolicyTarget, Queue, Topology, PLATFORM_DLQ,
    PLATFORM_DLX,
};

pub const VHOST: &str = "platform";

pub const TOPIC_EXCHANGES: [&str; 3] = ["domain.events", "integration.events", "commands"];

/// The platform topology with the standard topic exchanges
pub fn platform_topology() -> Topology {
    Topology::platform_default(VHOST, &TOPIC_EXCHANGES)
}

/// The platform topology plus an order-audit consumer
pub fn orders_topology() -> Topology {
    platform_topology()
        .queue(Queue::new("orders.audit").with_message_ttl_ms(3_600_000))
        .binding(Binding::new("domain.events", "orders.audit", "order.*"))
}

/// A consumer with its own retry exchange instead of the platform DLX
pub fn retrying_consumer_topology() -> Topology {
    platform_topology()
        .exchange(Exchange::direct("billing.retry"))
        .queue(Queue::new("billing.retry-later").with_message_ttl_ms(30_000))
        .queue(
            Queue::new("billing.invoices")
                .with_dead_letter(DeadLetter::new("billing.retry", "invoice")),
        )
        .binding(Binding::new("domain.events", "billing.invoices", "invoice.#"))
        .binding(Binding::new("billing.retry", "billing.retry-later", "invoice"))
}

/// A topology without any platform convention
pub fn minimal_topology() -> Topology {
    Topology::new("/")
        .exchange(Exchange::topic("events"))
        .queue(Queue::new("events.log"))
        .binding(Binding::new("events", "events.log", "#"))
        .policy(Policy::new("log-length", r"^events\.", PolicyTarget::Queues).with("max-length", 1000))
}

pub fn dlx() -> &'static str {
    PLATFORM_DLX
}

pub fn dlq() -> &'static str {
    PLATFORM_DLQ
}

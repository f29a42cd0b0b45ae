// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker Topology Resource Model
//!
//! In-memory representation of the desired broker state, validated before
//! anything touches the network.
//!
//! # Resources
//!
//! - [`VirtualHost`] - namespace every other resource lives in
//! - [`Exchange`] - topic, direct or fanout router with optional alternate exchange
//! - [`Queue`] - durable holding area with TTL, max-length and dead-letter clause
//! - [`Binding`] - exchange → queue rule with a routing-key pattern
//! - [`Policy`] - broker-side rule (HA, TTL, expiry) matched by name pattern
//!
//! # Dependency Graph
//!
//! ```text
//! VirtualHost → {Exchange, Queue} → Binding → Policy
//! ```
//!
//! [`Topology::plan`] turns a topology into this order; [`validate`] checks
//! every invariant up front.

pub mod binding;
pub mod exchange;
pub mod invariants;
pub mod name;
pub mod policy;
pub mod queue;
pub mod resource;
pub mod topology;

pub use binding::{topic_matches, Binding, CATCH_ALL};
pub use exchange::{Exchange, ExchangeKind};
pub use invariants::{validate, ValidationResult};
pub use name::{check_name, NameError};
pub use policy::{Policy, PolicyTarget};
pub use queue::{DeadLetter, Queue};
pub use resource::{BindingKey, Resource, ResourceKind, ResourceRef};
pub use topology::{
    DeadLetterTarget, Tier, Topology, TopologyPlan, VirtualHost, PLATFORM_DLQ, PLATFORM_DLX,
};

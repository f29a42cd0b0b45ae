// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker topology provisioning for the Composable Information Machine
//!
//! Declares the message broker resources the platform relies on (a
//! virtual host, exchanges, queues, bindings and policies) and brings a
//! broker in line with that declaration. Provisioning is idempotent:
//! running it twice against the same broker creates nothing the second
//! time, and an existing resource with a different definition is reported
//! as a conflict, never overwritten.
//!
//! # Modules
//!
//! - [`domain`] - topology model, validation and planning
//! - [`client`] - broker management clients (HTTP and in-memory)
//! - [`readiness`] - bounded wait for the broker to come up
//! - [`applier`] - tiered, concurrent apply with per-resource lifecycles
//! - [`provisioner`] - validate, wait, apply
//! - [`report`] - per-run outcome
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_broker_topology::{BrokerConfig, Provisioner, Topology};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig::from_env()?;
//!     let topology = Topology::platform_default(
//!         config.vhost.clone(),
//!         &["domain.events", "integration.events", "commands"],
//!     );
//!
//!     let report = Provisioner::from_config(config)?.provision(&topology).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod applier;
pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod provisioner;
pub mod readiness;
pub mod report;
pub mod state_machine;

// Re-export commonly used types
pub use applier::Applier;
pub use client::{BrokerApi, EnsureOutcome, InMemoryBroker, ManagementClient};
pub use config::{BrokerConfig, ReadinessSettings};
pub use domain::{Binding, Exchange, Policy, Queue, Topology, VirtualHost};
pub use errors::{ConflictError, TimeoutError, TopologyError, TopologyResult, ValidationError};
pub use provisioner::Provisioner;
pub use report::{ApplyReport, ResourceTrace};

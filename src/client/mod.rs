// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker Client
//!
//! Idempotent create-or-verify operations against a broker's management
//! interface. Every `ensure_*` call follows the same contract:
//!
//! | Broker state                        | Result                          |
//! |-------------------------------------|---------------------------------|
//! | resource absent                     | created, `EnsureOutcome::Created` |
//! | resource present, same definition   | no-op, `EnsureOutcome::Unchanged` |
//! | resource present, other definition  | `TopologyError::Conflict`, never overwritten |
//!
//! Implementations:
//! - [`ManagementClient`] - HTTP management API over `reqwest`
//! - [`InMemoryBroker`] - simulated broker for dry runs and tests

pub mod definitions;
pub mod http;
pub mod memory;
pub mod retry;

use async_trait::async_trait;
use std::fmt;

use crate::config::ReadinessSettings;
use crate::domain::{Binding, Exchange, Policy, Queue, VirtualHost};
use crate::errors::{TimeoutError, TopologyResult};

pub use http::ManagementClient;
pub use memory::{BrokerSnapshot, InMemoryBroker, Message, VhostSnapshot};
pub use retry::RetryPolicy;

/// What an `ensure_*` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The resource did not exist and was declared
    Created,
    /// The resource already matched its declaration
    Unchanged,
}

impl fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsureOutcome::Created => f.write_str("created"),
            EnsureOutcome::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// Declarative operations on a broker's management interface
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Single cheap status request; no retries
    async fn probe(&self) -> TopologyResult<()>;

    async fn ensure_virtual_host(&self, vhost: &VirtualHost) -> TopologyResult<EnsureOutcome>;

    async fn ensure_exchange(
        &self,
        vhost: &VirtualHost,
        exchange: &Exchange,
    ) -> TopologyResult<EnsureOutcome>;

    async fn ensure_queue(&self, vhost: &VirtualHost, queue: &Queue)
        -> TopologyResult<EnsureOutcome>;

    async fn ensure_binding(
        &self,
        vhost: &VirtualHost,
        binding: &Binding,
    ) -> TopologyResult<EnsureOutcome>;

    async fn ensure_policy(
        &self,
        vhost: &VirtualHost,
        policy: &Policy,
    ) -> TopologyResult<EnsureOutcome>;

    /// Block until [`probe`](Self::probe) succeeds or `settings.timeout` elapses
    async fn wait_until_ready(&self, settings: &ReadinessSettings) -> Result<(), TimeoutError> {
        crate::readiness::wait_until_ready(self, settings).await
    }

    /// Name used in logs
    fn name(&self) -> &str;
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioner
//!
//! One provisioning run end to end:
//!
//! 1. validate the topology (fatal, no network call)
//! 2. wait for the broker to become ready (fatal on timeout, no `ensure_*` call)
//! 3. apply the plan and report per-resource outcomes
//!
//! # Example
//!
//! ```rust
//! use cim_broker_topology::client::InMemoryBroker;
//! use cim_broker_topology::domain::Topology;
//! use cim_broker_topology::provisioner::Provisioner;
//!
//! # tokio_test::block_on(async {
//! let provisioner = Provisioner::new(InMemoryBroker::new());
//! let topology = Topology::platform_default("/", &["domain.events"]);
//!
//! let report = provisioner.provision(&topology).await.unwrap();
//! assert!(report.is_success());
//! # });
//! ```

use tracing::info;

use crate::applier::{Applier, DEFAULT_CONCURRENCY};
use crate::client::{BrokerApi, ManagementClient};
use crate::config::{BrokerConfig, ReadinessSettings};
use crate::domain::{validate, Topology};
use crate::errors::TopologyResult;
use crate::report::ApplyReport;

/// Validates, waits for readiness, and applies topologies to one broker
pub struct Provisioner<B> {
    broker: B,
    readiness: ReadinessSettings,
    concurrency: usize,
}

impl<B: BrokerApi> Provisioner<B> {
    pub fn new(broker: B) -> Self {
        Self {
            broker,
            readiness: ReadinessSettings::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_readiness(mut self, readiness: ReadinessSettings) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Provision `topology`
    ///
    /// Validation and readiness failures are returned as errors; once the
    /// apply phase starts, per-resource failures go into the report.
    pub async fn provision(&self, topology: &Topology) -> TopologyResult<ApplyReport> {
        validate(topology)?;
        info!(
            "Topology for vhost '{}' is valid: {} resources",
            topology.vhost,
            topology.resource_count()
        );

        self.broker.wait_until_ready(&self.readiness).await?;

        let plan = topology.plan();
        Ok(Applier::new(&self.broker)
            .with_concurrency(self.concurrency)
            .apply_plan(&plan)
            .await)
    }
}

impl Provisioner<ManagementClient> {
    /// A provisioner talking to the management API described by `config`
    pub fn from_config(config: BrokerConfig) -> TopologyResult<Self> {
        let readiness = config.readiness;
        let concurrency = config.concurrency;
        Ok(Self::new(ManagementClient::new(config)?)
            .with_readiness(readiness)
            .with_concurrency(concurrency))
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Provisioning Job
//!
//! Brings the platform broker in line with the declared topology, then
//! exits. Meant to run once per deployment, before any service that
//! publishes or consumes.
//!
//! Run with: cargo run --bin provision-topology
//!
//! Environment (see `BrokerConfig` for the connection settings):
//! - `TOPOLOGY_FILE` - JSON topology document; defaults to the platform topology
//! - `TOPOLOGY_EXCHANGES` - comma-separated topic exchanges of the platform topology
//! - `PROVISION_DRY_RUN` - `true` applies against an in-memory broker instead
//!
//! Exit codes:
//! - 0: every resource applied
//! - 1: at least one resource failed
//! - 2: invalid topology or configuration, or broker never became ready

use anyhow::{Context, Result};
use cim_broker_topology::{BrokerApi, BrokerConfig, InMemoryBroker, Provisioner, Topology};
use std::process::ExitCode;
use tracing::{error, info, warn};

const DEFAULT_EXCHANGES: &str = "domain.events,integration.events,commands";

/// What to provision
#[derive(Debug, Clone)]
struct JobConfig {
    topology_file: Option<String>,
    exchanges: Vec<String>,
    dry_run: bool,
}

impl JobConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let topology_file = std::env::var("TOPOLOGY_FILE").ok().filter(|s| !s.is_empty());

        let exchanges = std::env::var("TOPOLOGY_EXCHANGES")
            .unwrap_or_else(|_| DEFAULT_EXCHANGES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let dry_run = match std::env::var("PROVISION_DRY_RUN") {
            Ok(value) => value
                .parse::<bool>()
                .with_context(|| format!("PROVISION_DRY_RUN='{value}' is not true/false"))?,
            Err(_) => false,
        };

        Ok(Self {
            topology_file,
            exchanges,
            dry_run,
        })
    }

    fn topology(&self, vhost: &str) -> Result<Topology> {
        match &self.topology_file {
            Some(path) => Topology::from_json_file(path)
                .with_context(|| format!("Failed to load topology from {path}")),
            None => Ok(Topology::platform_default(vhost, &self.exchanges)),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            error!("Provisioning aborted: {:#}", err);
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<ExitCode> {
    info!("Starting topology provisioning");

    let broker_config = BrokerConfig::from_env().context("Invalid broker configuration")?;
    let job = JobConfig::from_env()?;
    info!("Configuration loaded:");
    info!("  - Management API: {}", broker_config.api_base());
    info!("  - Virtual host: {}", broker_config.vhost);
    info!(
        "  - Topology: {}",
        job.topology_file.as_deref().unwrap_or("platform default")
    );

    let topology = job.topology(&broker_config.vhost)?;

    if job.dry_run {
        warn!("Dry run: applying against an in-memory broker");
        let provisioner = Provisioner::new(InMemoryBroker::new())
            .with_readiness(broker_config.readiness)
            .with_concurrency(broker_config.concurrency);
        return finish(&provisioner, &topology).await;
    }

    let provisioner = Provisioner::from_config(broker_config)?;
    finish(&provisioner, &topology).await
}

async fn finish<B: BrokerApi>(provisioner: &Provisioner<B>, topology: &Topology) -> Result<ExitCode> {
    match provisioner.provision(topology).await {
        Ok(report) => {
            info!("{}", report);
            if report.is_success() {
                info!("Topology provisioned");
                Ok(ExitCode::SUCCESS)
            } else {
                error!("{} resource(s) could not be provisioned", report.failed.len());
                Ok(ExitCode::from(1))
            }
        }
        Err(err) => Err(err.into()),
    }
}

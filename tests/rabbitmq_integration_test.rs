// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests against a live RabbitMQ management API
//!
//! Requires a broker with the management plugin, e.g.
//! `docker run -p 15672:15672 rabbitmq:3-management`. Connection settings
//! come from the usual `RABBITMQ_*` variables.
//!
//! Run with: cargo test --test rabbitmq_integration_test -- --ignored

mod fixtures;

use cim_broker_topology::client::{BrokerApi, EnsureOutcome, ManagementClient};
use cim_broker_topology::domain::{Queue, VirtualHost};
use cim_broker_topology::{BrokerConfig, Provisioner, TopologyError};
use fixtures::*;

fn config() -> BrokerConfig {
    BrokerConfig::from_env().expect("invalid RABBITMQ_* configuration")
}

/// A vhost per run so runs do not see each other's resources
fn scratch_vhost() -> String {
    format!("topology-test-{}", uuid::Uuid::now_v7())
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ with the management plugin"]
async fn test_provision_is_idempotent_on_rabbitmq() {
    let vhost = scratch_vhost();
    let provisioner = Provisioner::from_config(config()).unwrap();
    let topology = orders_topology();
    let topology = cim_broker_topology::Topology {
        vhost: VirtualHost::new(&vhost),
        ..topology
    };

    let first = provisioner.provision(&topology).await.unwrap();
    println!("{first}");
    assert!(first.is_success());
    assert_eq!(first.created.len(), topology.resource_count());

    let second = provisioner.provision(&topology).await.unwrap();
    assert!(second.is_success());
    assert!(second.created.is_empty());
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ with the management plugin"]
async fn test_durability_conflict_on_rabbitmq() {
    let vhost = VirtualHost::new(scratch_vhost());
    let client = ManagementClient::new(config()).unwrap();
    client.probe().await.unwrap();
    client.ensure_virtual_host(&vhost).await.unwrap();

    assert_eq!(
        client.ensure_queue(&vhost, &Queue::new("Q").durable(true)).await,
        Ok(EnsureOutcome::Created)
    );
    let err = client
        .ensure_queue(&vhost, &Queue::new("Q").durable(false))
        .await
        .unwrap_err();

    assert!(matches!(err, TopologyError::Conflict(ref c) if c.resource_name == "Q"));
}

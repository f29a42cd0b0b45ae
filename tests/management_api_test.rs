// Copyright (c) 2025 - Cowboy AI, Inc.
//! Management API Client Tests
//!
//! Runs `ManagementClient` against a stub HTTP server to pin down how
//! status codes map onto outcomes:
//! - 5xx is retried as a connectivity failure
//! - 404 means absent, followed by a PUT/POST
//! - other 4xx surface as `Rejected` without a retry
//! - an existing resource that differs is a conflict and is never written

use std::time::Duration;

use cim_broker_topology::client::{BrokerApi, EnsureOutcome, ManagementClient, RetryPolicy};
use cim_broker_topology::domain::{Binding, Queue, ResourceKind, VirtualHost};
use cim_broker_topology::{BrokerConfig, TopologyError};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE_PATH: &str = "/api/queues/%2F/orders.audit";
const BINDING_PATH: &str = "/api/bindings/%2F/e/orders/q/orders.audit";

fn client_for(server: &MockServer) -> ManagementClient {
    let address = server.address();
    let config = BrokerConfig {
        host: address.ip().to_string(),
        port: address.port(),
        retry: RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(5),
            multiplier: 1.0,
        },
        ..BrokerConfig::default()
    };
    ManagementClient::new(config).unwrap()
}

async fn methods_received(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.method.to_string())
        .collect()
}

fn vhost() -> VirtualHost {
    VirtualHost::new("/")
}

#[tokio::test]
async fn test_server_error_is_retried_then_absent_queue_is_created() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .ensure_queue(&vhost(), &Queue::new("orders.audit"))
        .await;

    assert_eq!(outcome, Ok(EnsureOutcome::Created));
    assert_eq!(methods_received(&server).await, vec!["GET", "GET", "PUT"]);
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .ensure_queue(&vhost(), &Queue::new("orders.audit"))
        .await
        .unwrap_err();

    assert!(matches!(err, TopologyError::Connectivity { attempts: 3, .. }));
}

#[tokio::test]
async fn test_client_error_is_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("not authorised"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .ensure_queue(&vhost(), &Queue::new("orders.audit"))
        .await
        .unwrap_err();

    match err {
        TopologyError::Rejected { status, message, .. } => {
            assert_eq!(status, 401);
            assert_eq!(message, "not authorised");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_existing_queue_with_other_durability_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "orders.audit",
            "durable": false,
            "auto_delete": false,
            "arguments": {"x-queue-type": "classic"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .ensure_queue(&vhost(), &Queue::new("orders.audit"))
        .await
        .unwrap_err();

    match err {
        TopologyError::Conflict(conflict) => {
            assert_eq!(conflict.resource_kind, ResourceKind::Queue);
            assert_eq!(conflict.resource_name, "orders.audit");
            assert_eq!(conflict.expected, "durable=true");
            assert_eq!(conflict.actual, "durable=false");
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_matching_queue_is_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "durable": true,
            "auto_delete": false,
            "arguments": {"x-max-length": 10, "x-queue-type": "classic"}
        })))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .ensure_queue(&vhost(), &Queue::new("orders.audit").with_max_length(10))
        .await;

    assert_eq!(outcome, Ok(EnsureOutcome::Unchanged));
    assert_eq!(methods_received(&server).await, vec!["GET"]);
}

#[tokio::test]
async fn test_existing_binding_key_is_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BINDING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"source": "orders", "destination": "orders.audit", "routing_key": "order.*", "arguments": {}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .ensure_binding(&vhost(), &Binding::new("orders", "orders.audit", "order.*"))
        .await;

    assert_eq!(outcome, Ok(EnsureOutcome::Unchanged));
}

#[tokio::test]
async fn test_new_binding_key_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BINDING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"routing_key": "order.*", "arguments": {}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(BINDING_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .ensure_binding(&vhost(), &Binding::new("orders", "orders.audit", "#"))
        .await;

    assert_eq!(outcome, Ok(EnsureOutcome::Created));
    assert_eq!(methods_received(&server).await, vec!["GET", "POST"]);
}

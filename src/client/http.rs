// Copyright (c) 2025 - Cowboy AI, Inc.
//! HTTP Management API Client
//!
//! Implements [`BrokerApi`] against a RabbitMQ-compatible management API:
//!
//! ```text
//! probe                 GET  /api/overview
//! ensure_virtual_host   GET|PUT  /api/vhosts/{vhost}
//! ensure_exchange       GET|PUT  /api/exchanges/{vhost}/{name}
//! ensure_queue          GET|PUT  /api/queues/{vhost}/{name}
//! ensure_binding        GET|POST /api/bindings/{vhost}/e/{exchange}/q/{queue}
//! ensure_policy         GET|PUT  /api/policies/{vhost}/{name}
//! ```
//!
//! Each `ensure_*` call reads the existing resource first and only writes
//! when it is absent, so an existing resource is never overwritten. Path
//! segments are percent-encoded (the default vhost `/` becomes `%2F`).
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_broker_topology::client::{BrokerApi, ManagementClient};
//! use cim_broker_topology::config::BrokerConfig;
//! use cim_broker_topology::domain::{Queue, VirtualHost};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ManagementClient::new(BrokerConfig::default())?;
//!     client.probe().await?;
//!
//!     let outcome = client
//!         .ensure_queue(&VirtualHost::new("/"), &Queue::new("orders.audit"))
//!         .await?;
//!     println!("orders.audit: {outcome}");
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::definitions::{
    exchange_drift, policy_drift, queue_drift, BindingDefinition, ExchangeDefinition,
    PolicyDefinition, QueueDefinition, VhostDefinition,
};
use super::{BrokerApi, EnsureOutcome, RetryPolicy};
use crate::config::BrokerConfig;
use crate::domain::{Binding, Exchange, Policy, Queue, ResourceKind, VirtualHost};
use crate::errors::{TopologyError, TopologyResult};

/// Management API client sharing one connection pool and one retry policy
#[derive(Debug, Clone)]
pub struct ManagementClient {
    config: BrokerConfig,
    http: Client,
    retry: RetryPolicy,
}

impl ManagementClient {
    /// Create a client; no request is made until the first call
    pub fn new(config: BrokerConfig) -> TopologyResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                TopologyError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!("Using broker management API at {}", config.api_base());

        Ok(Self {
            retry: config.retry,
            config,
            http,
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// API URL from raw path segments, each percent-encoded
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.config.api_base();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    /// Send with retries; 5xx and transport failures are transient
    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> TopologyResult<Response> {
        self.retry
            .run(operation, || {
                let mut request = self.request(method.clone(), url);
                if let Some(body) = body {
                    request = request.json(body);
                }
                async move {
                    let response = request.send().await.map_err(transport_error)?;
                    let status = response.status();
                    if status.is_server_error() {
                        let message = response.text().await.unwrap_or_default();
                        return Err(TopologyError::connectivity(format!(
                            "HTTP {}: {}",
                            status, message
                        )));
                    }
                    Ok(response)
                }
            })
            .await
    }

    /// `None` when the resource does not exist
    async fn get<T: DeserializeOwned>(&self, operation: &str, url: &str) -> TopologyResult<Option<T>> {
        debug!("GET {}", url);
        let response = self.send(operation, Method::GET, url, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .json::<T>()
                    .await
                    .map_err(|e| TopologyError::Serialization(format!("{operation}: {e}")))?;
                Ok(Some(body))
            }
            _ => Err(rejected(operation, response).await),
        }
    }

    async fn write(&self, operation: &str, method: Method, url: &str, body: Value) -> TopologyResult<()> {
        debug!("{} {}", method, url);
        let response = self.send(operation, method, url, Some(&body)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejected(operation, response).await)
        }
    }
}

fn transport_error(err: reqwest::Error) -> TopologyError {
    if err.is_builder() {
        TopologyError::Configuration(err.to_string())
    } else {
        TopologyError::connectivity(err.to_string())
    }
}

async fn rejected(operation: &str, response: Response) -> TopologyError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    TopologyError::Rejected {
        operation: operation.to_string(),
        status,
        message,
    }
}

#[async_trait]
impl BrokerApi for ManagementClient {
    async fn probe(&self) -> TopologyResult<()> {
        let url = self.url(&["overview"]);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TopologyError::connectivity(format!(
                "management API returned {}",
                response.status()
            )))
        }
    }

    async fn ensure_virtual_host(&self, vhost: &VirtualHost) -> TopologyResult<EnsureOutcome> {
        let url = self.url(&["vhosts", &vhost.name]);
        let operation = format!("vhost '{}'", vhost.name);

        if self.get::<Value>(&operation, &url).await?.is_some() {
            return Ok(EnsureOutcome::Unchanged);
        }

        let body = serde_json::to_value(VhostDefinition::default())?;
        self.write(&operation, Method::PUT, &url, body).await?;
        Ok(EnsureOutcome::Created)
    }

    async fn ensure_exchange(
        &self,
        vhost: &VirtualHost,
        exchange: &Exchange,
    ) -> TopologyResult<EnsureOutcome> {
        let url = self.url(&["exchanges", &vhost.name, &exchange.name]);
        let operation = format!("exchange '{}'", exchange.name);
        let desired = ExchangeDefinition::from(exchange);

        match self.get::<ExchangeDefinition>(&operation, &url).await? {
            Some(actual) => {
                exchange_drift(&desired, &actual).into_result(ResourceKind::Exchange, &exchange.name)?;
                Ok(EnsureOutcome::Unchanged)
            }
            None => {
                let body = serde_json::to_value(&desired)?;
                self.write(&operation, Method::PUT, &url, body).await?;
                Ok(EnsureOutcome::Created)
            }
        }
    }

    async fn ensure_queue(&self, vhost: &VirtualHost, queue: &Queue) -> TopologyResult<EnsureOutcome> {
        let url = self.url(&["queues", &vhost.name, &queue.name]);
        let operation = format!("queue '{}'", queue.name);
        let desired = QueueDefinition::from(queue);

        match self.get::<QueueDefinition>(&operation, &url).await? {
            Some(actual) => {
                queue_drift(&desired, &actual).into_result(ResourceKind::Queue, &queue.name)?;
                Ok(EnsureOutcome::Unchanged)
            }
            None => {
                let body = serde_json::to_value(&desired)?;
                self.write(&operation, Method::PUT, &url, body).await?;
                Ok(EnsureOutcome::Created)
            }
        }
    }

    async fn ensure_binding(
        &self,
        vhost: &VirtualHost,
        binding: &Binding,
    ) -> TopologyResult<EnsureOutcome> {
        let url = self.url(&[
            "bindings",
            &vhost.name,
            "e",
            &binding.source_exchange,
            "q",
            &binding.destination_queue,
        ]);
        let operation = binding.resource_ref().to_string();
        let desired = BindingDefinition::from(binding);

        let existing = self
            .get::<Vec<BindingDefinition>>(&operation, &url)
            .await?
            .unwrap_or_default();
        if existing.iter().any(|b| b.routing_key == desired.routing_key) {
            return Ok(EnsureOutcome::Unchanged);
        }

        let body = serde_json::to_value(&desired)?;
        self.write(&operation, Method::POST, &url, body).await?;
        Ok(EnsureOutcome::Created)
    }

    async fn ensure_policy(
        &self,
        vhost: &VirtualHost,
        policy: &Policy,
    ) -> TopologyResult<EnsureOutcome> {
        let url = self.url(&["policies", &vhost.name, &policy.name]);
        let operation = format!("policy '{}'", policy.name);
        let desired = PolicyDefinition::from(policy);

        match self.get::<PolicyDefinition>(&operation, &url).await? {
            Some(actual) => {
                policy_drift(&desired, &actual).into_result(ResourceKind::Policy, &policy.name)?;
                Ok(EnsureOutcome::Unchanged)
            }
            None => {
                let body = serde_json::to_value(&desired)?;
                self.write(&operation, Method::PUT, &url, body).await?;
                Ok(EnsureOutcome::Created)
            }
        }
    }

    fn name(&self) -> &str {
        "rabbitmq-management"
    }
}

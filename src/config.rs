// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration for the broker management connection
//!
//! Every setting has a default suitable for a local development broker and
//! can be overridden per deployment through the environment:
//!
//! | Variable                          | Default     |
//! |-----------------------------------|-------------|
//! | `RABBITMQ_HOST`                   | `localhost` |
//! | `RABBITMQ_MANAGEMENT_PORT`        | `15672`     |
//! | `RABBITMQ_SCHEME`                 | `http`      |
//! | `RABBITMQ_USER`                   | `guest`     |
//! | `RABBITMQ_PASSWORD`               | `guest`     |
//! | `RABBITMQ_VHOST`                  | `/`         |
//! | `PROVISION_REQUEST_TIMEOUT_SECS`  | `10`        |
//! | `PROVISION_READY_TIMEOUT_SECS`    | `60`        |
//! | `PROVISION_POLL_INTERVAL_MS`      | `1000`      |
//! | `PROVISION_MAX_RETRIES`           | `5`         |
//! | `PROVISION_CONCURRENCY`           | `4`         |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::client::RetryPolicy;
use crate::errors::{TopologyError, TopologyResult};

/// Readiness polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessSettings {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between probes
    pub poll_interval: Duration,
}

impl ReadinessSettings {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

/// Connection settings for the broker management API
#[derive(Clone, PartialEq)]
pub struct BrokerConfig {
    /// Management API host
    pub host: String,
    /// Management API port
    pub port: u16,
    /// `http` or `https`
    pub scheme: String,
    pub username: String,
    pub password: String,
    /// Virtual host the topology is provisioned into
    pub vhost: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub readiness: ReadinessSettings,
    pub retry: RetryPolicy,
    /// Resources provisioned concurrently within a tier
    pub concurrency: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 15672,
            scheme: "http".to_string(),
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            request_timeout: Duration::from_secs(10),
            readiness: ReadinessSettings::default(),
            retry: RetryPolicy::default(),
            concurrency: 4,
        }
    }
}

// Keeps the password out of logs
impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &"***")
            .field("vhost", &self.vhost)
            .field("request_timeout", &self.request_timeout)
            .field("readiness", &self.readiness)
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl BrokerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> TopologyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> TopologyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        let request_timeout_secs: u64 = parse(&lookup, "PROVISION_REQUEST_TIMEOUT_SECS", 10)?;
        let ready_timeout_secs: u64 = parse(&lookup, "PROVISION_READY_TIMEOUT_SECS", 60)?;
        let poll_interval_ms: u64 = parse(&lookup, "PROVISION_POLL_INTERVAL_MS", 1000)?;
        let max_retries: u32 = parse(&lookup, "PROVISION_MAX_RETRIES", defaults.retry.max_retries)?;
        let concurrency: usize = parse(&lookup, "PROVISION_CONCURRENCY", defaults.concurrency)?;

        if poll_interval_ms == 0 {
            return Err(TopologyError::Configuration(
                "PROVISION_POLL_INTERVAL_MS must be positive".to_string(),
            ));
        }
        if concurrency == 0 {
            return Err(TopologyError::Configuration(
                "PROVISION_CONCURRENCY must be positive".to_string(),
            ));
        }

        let scheme = text("RABBITMQ_SCHEME", defaults.scheme);
        if scheme != "http" && scheme != "https" {
            return Err(TopologyError::Configuration(format!(
                "RABBITMQ_SCHEME must be http or https, got '{scheme}'"
            )));
        }

        Ok(Self {
            host: text("RABBITMQ_HOST", defaults.host),
            port: parse(&lookup, "RABBITMQ_MANAGEMENT_PORT", defaults.port)?,
            scheme,
            username: text("RABBITMQ_USER", defaults.username),
            password: text("RABBITMQ_PASSWORD", defaults.password),
            vhost: text("RABBITMQ_VHOST", defaults.vhost),
            request_timeout: Duration::from_secs(request_timeout_secs),
            readiness: ReadinessSettings::new(
                Duration::from_secs(ready_timeout_secs),
                Duration::from_millis(poll_interval_ms),
            ),
            retry: RetryPolicy {
                max_retries,
                ..defaults.retry
            },
            concurrency,
        })
    }

    /// Root of the management API, e.g. `http://localhost:15672/api`
    pub fn api_base(&self) -> String {
        format!("{}://{}:{}/api", self.scheme, self.host, self.port)
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> TopologyResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            TopologyError::Configuration(format!("{key}='{raw}' is invalid: {e}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = BrokerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, BrokerConfig::default());
        assert_eq!(config.api_base(), "http://localhost:15672/api");
    }

    #[test]
    fn test_overrides() {
        let config = BrokerConfig::from_lookup(lookup_from(&[
            ("RABBITMQ_HOST", "rabbitmq"),
            ("RABBITMQ_MANAGEMENT_PORT", "8080"),
            ("RABBITMQ_VHOST", "platform"),
            ("PROVISION_READY_TIMEOUT_SECS", "2"),
            ("PROVISION_POLL_INTERVAL_MS", "500"),
            ("PROVISION_MAX_RETRIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_base(), "http://rabbitmq:8080/api");
        assert_eq!(config.vhost, "platform");
        assert_eq!(config.readiness.timeout, Duration::from_secs(2));
        assert_eq!(config.readiness.poll_interval, Duration::from_millis(500));
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn test_invalid_values() {
        let err = BrokerConfig::from_lookup(lookup_from(&[("RABBITMQ_MANAGEMENT_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(ref m) if m.contains("RABBITMQ_MANAGEMENT_PORT")));

        assert!(BrokerConfig::from_lookup(lookup_from(&[("PROVISION_CONCURRENCY", "0")])).is_err());
        assert!(BrokerConfig::from_lookup(lookup_from(&[("RABBITMQ_SCHEME", "amqp")])).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = BrokerConfig {
            password: "s3cret".to_string(),
            ..BrokerConfig::default()
        };
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}

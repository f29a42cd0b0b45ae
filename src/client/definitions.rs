// Copyright (c) 2025 - Cowboy AI, Inc.
//! Management API resource definitions
//!
//! Request and response bodies of the broker's HTTP management API, and the
//! comparison that decides whether an existing resource matches its
//! declaration.
//!
//! Only attributes this crate declares are compared. Brokers add their own
//! arguments (`x-queue-type`, ...) and those are not drift.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

use crate::domain::{Binding, Exchange, Policy, Queue, ResourceKind};
use crate::errors::ConflictError;

pub const ARG_ALTERNATE_EXCHANGE: &str = "alternate-exchange";
pub const ARG_MESSAGE_TTL: &str = "x-message-ttl";
pub const ARG_MAX_LENGTH: &str = "x-max-length";
pub const ARG_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";
pub const ARG_DEAD_LETTER_ROUTING_KEY: &str = "x-dead-letter-routing-key";

const EXCHANGE_ARGUMENTS: [&str; 1] = [ARG_ALTERNATE_EXCHANGE];

const QUEUE_ARGUMENTS: [&str; 4] = [
    ARG_MESSAGE_TTL,
    ARG_MAX_LENGTH,
    ARG_DEAD_LETTER_EXCHANGE,
    ARG_DEAD_LETTER_ROUTING_KEY,
];

/// `/api/vhosts/{vhost}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VhostDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `/api/exchanges/{vhost}/{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl From<&Exchange> for ExchangeDefinition {
    fn from(exchange: &Exchange) -> Self {
        let mut arguments = Map::new();
        if let Some(alternate) = &exchange.alternate_exchange {
            arguments.insert(ARG_ALTERNATE_EXCHANGE.to_string(), Value::from(alternate.as_str()));
        }
        Self {
            kind: exchange.kind.as_str().to_string(),
            durable: exchange.durable,
            auto_delete: exchange.auto_delete,
            internal: false,
            arguments,
        }
    }
}

/// `/api/queues/{vhost}/{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDefinition {
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl From<&Queue> for QueueDefinition {
    fn from(queue: &Queue) -> Self {
        let mut arguments = Map::new();
        if let Some(ttl) = queue.message_ttl_ms {
            arguments.insert(ARG_MESSAGE_TTL.to_string(), Value::from(ttl));
        }
        if let Some(max_length) = queue.max_length {
            arguments.insert(ARG_MAX_LENGTH.to_string(), Value::from(max_length));
        }
        if let Some(dead_letter) = &queue.dead_letter {
            arguments.insert(
                ARG_DEAD_LETTER_EXCHANGE.to_string(),
                Value::from(dead_letter.exchange.as_str()),
            );
            if !dead_letter.routing_key.is_empty() {
                arguments.insert(
                    ARG_DEAD_LETTER_ROUTING_KEY.to_string(),
                    Value::from(dead_letter.routing_key.as_str()),
                );
            }
        }
        Self {
            durable: queue.durable,
            auto_delete: queue.auto_delete,
            arguments,
        }
    }
}

/// `/api/bindings/{vhost}/e/{exchange}/q/{queue}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingDefinition {
    pub routing_key: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl From<&Binding> for BindingDefinition {
    fn from(binding: &Binding) -> Self {
        Self {
            routing_key: binding.routing_key.clone(),
            arguments: Map::new(),
        }
    }
}

/// `/api/policies/{vhost}/{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub pattern: String,
    #[serde(rename = "apply-to")]
    pub apply_to: String,
    pub definition: Map<String, Value>,
    #[serde(default)]
    pub priority: i32,
}

impl From<&Policy> for PolicyDefinition {
    fn from(policy: &Policy) -> Self {
        Self {
            pattern: policy.pattern.clone(),
            apply_to: policy.applies_to.as_str().to_string(),
            definition: policy
                .definition
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            priority: policy.priority,
        }
    }
}

/// Differences between a declared and an existing definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    expected: Vec<String>,
    actual: Vec<String>,
}

impl Drift {
    fn field<T: PartialEq + Display>(&mut self, name: &str, expected: T, actual: T) {
        if expected != actual {
            self.expected.push(format!("{name}={expected}"));
            self.actual.push(format!("{name}={actual}"));
        }
    }

    fn arguments(&mut self, keys: &[&str], expected: &Map<String, Value>, actual: &Map<String, Value>) {
        for key in keys {
            let (want, have) = (expected.get(*key), actual.get(*key));
            if want != have {
                self.expected.push(format!("{key}={}", render(want)));
                self.actual.push(format!("{key}={}", render(have)));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    /// `Ok` when nothing drifted, otherwise the conflict to report
    pub fn into_result(self, kind: ResourceKind, name: &str) -> Result<(), ConflictError> {
        if self.is_empty() {
            return Ok(());
        }
        Err(ConflictError {
            resource_kind: kind,
            resource_name: name.to_string(),
            expected: self.expected.join(", "),
            actual: self.actual.join(", "),
        })
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None => "<unset>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn exchange_drift(expected: &ExchangeDefinition, actual: &ExchangeDefinition) -> Drift {
    let mut drift = Drift::default();
    drift.field("type", expected.kind.as_str(), actual.kind.as_str());
    drift.field("durable", expected.durable, actual.durable);
    drift.field("auto_delete", expected.auto_delete, actual.auto_delete);
    drift.field("internal", expected.internal, actual.internal);
    drift.arguments(&EXCHANGE_ARGUMENTS, &expected.arguments, &actual.arguments);
    drift
}

pub fn queue_drift(expected: &QueueDefinition, actual: &QueueDefinition) -> Drift {
    let mut drift = Drift::default();
    drift.field("durable", expected.durable, actual.durable);
    drift.field("auto_delete", expected.auto_delete, actual.auto_delete);
    drift.arguments(&QUEUE_ARGUMENTS, &expected.arguments, &actual.arguments);
    drift
}

pub fn policy_drift(expected: &PolicyDefinition, actual: &PolicyDefinition) -> Drift {
    let mut drift = Drift::default();
    drift.field("pattern", expected.pattern.as_str(), actual.pattern.as_str());
    drift.field("apply-to", expected.apply_to.as_str(), actual.apply_to.as_str());
    drift.field("priority", expected.priority, actual.priority);
    drift.field(
        "definition",
        Value::Object(expected.definition.clone()),
        Value::Object(actual.definition.clone()),
    );
    drift
}

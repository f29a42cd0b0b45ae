// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy declarations
//!
//! Policies are matched against resource names by the broker itself; this
//! crate only declares them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::ResourceRef;

/// Which resources a policy pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyTarget {
    Queues,
    Exchanges,
}

impl PolicyTarget {
    /// Name used by the broker's management API (`apply-to`)
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyTarget::Queues => "queues",
            PolicyTarget::Exchanges => "exchanges",
        }
    }
}

impl fmt::Display for PolicyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared policy, e.g. `ha-mode: all` or `message-ttl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,
    /// Regular expression matched against resource names
    pub pattern: String,
    pub applies_to: PolicyTarget,
    pub definition: BTreeMap<String, Value>,
    #[serde(default)]
    pub priority: i32,
}

impl Policy {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, applies_to: PolicyTarget) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            applies_to,
            definition: BTreeMap::new(),
            priority: 0,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.definition.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::policy(&self.name)
    }
}

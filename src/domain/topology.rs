// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology - the desired broker state
//!
//! A [`Topology`] is the complete, static declaration of one virtual host:
//! its exchanges, queues, bindings and policies, plus an optional platform
//! dead-letter convention. It is planned into dependency tiers by
//! [`Topology::plan`]:
//!
//! ```text
//! VirtualHost ──> Exchanges ──> Queues ──> Bindings ──> Policies
//! ```
//!
//! # Dead-letter convention
//!
//! When a [`DeadLetterTarget`] is designated, planning fills in defaults so
//! no message is silently dropped:
//! - queues without a dead-letter clause dead-letter to the DLX
//! - topic exchanges without an alternate exchange fall back to the DLX
//! - the DLQ itself and the DLX itself are left untouched

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::{
    Binding, DeadLetter, Exchange, ExchangeKind, Policy, PolicyTarget, Queue, Resource,
    ResourceKind, ResourceRef, CATCH_ALL,
};
use crate::errors::{TopologyError, TopologyResult};

/// Platform dead-letter exchange of the default topology
pub const PLATFORM_DLX: &str = "platform.dlx";

/// Platform dead-letter queue of the default topology
pub const PLATFORM_DLQ: &str = "platform.dead-letters";

/// Dead letters are kept for 7 days
pub const PLATFORM_DLQ_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

pub const PLATFORM_DLQ_MAX_LENGTH: u64 = 100_000;

/// A broker virtual host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualHost {
    pub name: String,
}

impl VirtualHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::vhost(&self.name)
    }
}

impl fmt::Display for VirtualHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The platform-wide dead-letter exchange and the queue retaining its messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterTarget {
    pub exchange: String,
    pub queue: String,
}

/// Desired state of one virtual host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub vhost: VirtualHost,
    #[serde(default)]
    pub exchanges: Vec<Exchange>,
    #[serde(default)]
    pub queues: Vec<Queue>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter: Option<DeadLetterTarget>,
}

impl Topology {
    /// An empty topology for `vhost`
    pub fn new(vhost: impl Into<String>) -> Self {
        Self {
            vhost: VirtualHost::new(vhost),
            exchanges: Vec::new(),
            queues: Vec::new(),
            bindings: Vec::new(),
            policies: Vec::new(),
            dead_letter: None,
        }
    }

    pub fn exchange(mut self, exchange: Exchange) -> Self {
        self.exchanges.push(exchange);
        self
    }

    pub fn queue(mut self, queue: Queue) -> Self {
        self.queues.push(queue);
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Designate the platform dead-letter exchange and queue
    pub fn dead_letter_target(mut self, exchange: impl Into<String>, queue: impl Into<String>) -> Self {
        self.dead_letter = Some(DeadLetterTarget {
            exchange: exchange.into(),
            queue: queue.into(),
        });
        self
    }

    /// The default platform topology
    ///
    /// One DLX, one bounded catch-all DLQ, and a durable topic exchange per
    /// entry of `topic_exchanges`, each falling back to the DLX. Two
    /// policies mirror every queue and expire idle `transient.*` queues.
    pub fn platform_default<S: AsRef<str>>(vhost: impl Into<String>, topic_exchanges: &[S]) -> Self {
        let mut topology = Topology::new(vhost)
            .dead_letter_target(PLATFORM_DLX, PLATFORM_DLQ)
            .exchange(Exchange::topic(PLATFORM_DLX))
            .queue(
                Queue::new(PLATFORM_DLQ)
                    .with_message_ttl_ms(PLATFORM_DLQ_TTL_MS)
                    .with_max_length(PLATFORM_DLQ_MAX_LENGTH),
            )
            .binding(Binding::new(PLATFORM_DLX, PLATFORM_DLQ, CATCH_ALL));

        for name in topic_exchanges {
            topology = topology.exchange(
                Exchange::topic(name.as_ref()).with_alternate_exchange(PLATFORM_DLX),
            );
        }

        topology
            .policy(
                Policy::new("ha-all", ".*", PolicyTarget::Queues)
                    .with("ha-mode", "all")
                    .with("ha-sync-mode", "automatic"),
            )
            .policy(
                Policy::new("transient-expiry", r"^transient\.", PolicyTarget::Queues)
                    .with("expires", 30 * 60 * 1000)
                    .with_priority(1),
            )
    }

    /// Parse a JSON topology document
    pub fn from_json_str(document: &str) -> TopologyResult<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Read and parse a JSON topology document
    pub fn from_json_file(path: impl AsRef<Path>) -> TopologyResult<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            TopologyError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&document)
    }

    pub fn find_exchange(&self, name: &str) -> Option<&Exchange> {
        self.exchanges.iter().find(|e| e.name == name)
    }

    pub fn find_queue(&self, name: &str) -> Option<&Queue> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn is_dead_letter_queue(&self, queue: &str) -> bool {
        self.dead_letter.as_ref().is_some_and(|t| t.queue == queue)
    }

    /// Total number of resources, the vhost included
    pub fn resource_count(&self) -> usize {
        1 + self.exchanges.len() + self.queues.len() + self.bindings.len() + self.policies.len()
    }

    /// The same topology with dead-letter defaults filled in
    pub fn with_dead_letter_defaults(&self) -> Topology {
        let mut resolved = self.clone();
        let Some(target) = &self.dead_letter else {
            return resolved;
        };

        for exchange in &mut resolved.exchanges {
            if exchange.kind == ExchangeKind::Topic
                && exchange.name != target.exchange
                && exchange.alternate_exchange.is_none()
            {
                exchange.alternate_exchange = Some(target.exchange.clone());
            }
        }

        for queue in &mut resolved.queues {
            if queue.name != target.queue && queue.dead_letter.is_none() {
                queue.dead_letter = Some(DeadLetter::to_exchange(&target.exchange));
            }
        }

        resolved
    }

    /// Deterministic provisioning order
    ///
    /// Five tiers (vhost, exchanges, queues, bindings, policies); inside a
    /// tier resources keep their declaration order.
    pub fn plan(&self) -> TopologyPlan {
        let resolved = self.with_dead_letter_defaults();
        let tiers = vec![
            Tier {
                kind: ResourceKind::VirtualHost,
                resources: vec![Resource::VirtualHost(resolved.vhost.clone())],
            },
            Tier {
                kind: ResourceKind::Exchange,
                resources: resolved.exchanges.into_iter().map(Resource::Exchange).collect(),
            },
            Tier {
                kind: ResourceKind::Queue,
                resources: resolved.queues.into_iter().map(Resource::Queue).collect(),
            },
            Tier {
                kind: ResourceKind::Binding,
                resources: resolved.bindings.into_iter().map(Resource::Binding).collect(),
            },
            Tier {
                kind: ResourceKind::Policy,
                resources: resolved.policies.into_iter().map(Resource::Policy).collect(),
            },
        ];

        TopologyPlan {
            vhost: resolved.vhost,
            tiers,
        }
    }
}

/// Resources of one kind, provisioned together
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub kind: ResourceKind,
    pub resources: Vec<Resource>,
}

/// A topology ordered into dependency tiers
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyPlan {
    pub vhost: VirtualHost,
    pub tiers: Vec<Tier>,
}

impl TopologyPlan {
    /// Every resource reference in provisioning order
    pub fn order(&self) -> Vec<ResourceRef> {
        self.tiers
            .iter()
            .flat_map(|tier| tier.resources.iter().map(Resource::resource_ref))
            .collect()
    }
}

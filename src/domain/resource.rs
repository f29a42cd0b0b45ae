// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource identity shared by the planner, the applier and the report

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Binding, Exchange, Policy, Queue, VirtualHost};

/// Kind of broker resource, in provisioning order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    VirtualHost,
    Exchange,
    Queue,
    Binding,
    Policy,
}

impl ResourceKind {
    /// All kinds in the order they are provisioned
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::VirtualHost,
        ResourceKind::Exchange,
        ResourceKind::Queue,
        ResourceKind::Binding,
        ResourceKind::Policy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::VirtualHost => "vhost",
            ResourceKind::Exchange => "exchange",
            ResourceKind::Queue => "queue",
            ResourceKind::Binding => "binding",
            ResourceKind::Policy => "policy",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a declared resource
///
/// Bindings have no name of their own; their reference name is
/// `source -> destination [routing_key]`. Names may contain those
/// separators, so a binding is identified by its `(source, destination,
/// routing_key)` triple, not by the formatted name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingKey>,
}

/// Identity of a binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingKey {
    pub source: String,
    pub destination: String,
    pub routing_key: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            binding: None,
        }
    }

    pub fn vhost(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::VirtualHost, name)
    }

    pub fn exchange(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Exchange, name)
    }

    pub fn queue(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Queue, name)
    }

    pub fn binding(source: &str, destination: &str, routing_key: &str) -> Self {
        Self {
            kind: ResourceKind::Binding,
            name: format!("{source} -> {destination} [{routing_key}]"),
            binding: Some(BindingKey {
                source: source.to_string(),
                destination: destination.to_string(),
                routing_key: routing_key.to_string(),
            }),
        }
    }

    pub fn policy(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Policy, name)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// A single declared resource, as scheduled by the plan
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    VirtualHost(VirtualHost),
    Exchange(Exchange),
    Queue(Queue),
    Binding(Binding),
    Policy(Policy),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::VirtualHost(_) => ResourceKind::VirtualHost,
            Resource::Exchange(_) => ResourceKind::Exchange,
            Resource::Queue(_) => ResourceKind::Queue,
            Resource::Binding(_) => ResourceKind::Binding,
            Resource::Policy(_) => ResourceKind::Policy,
        }
    }

    pub fn resource_ref(&self) -> ResourceRef {
        match self {
            Resource::VirtualHost(v) => v.resource_ref(),
            Resource::Exchange(e) => e.resource_ref(),
            Resource::Queue(q) => q.resource_ref(),
            Resource::Binding(b) => b.resource_ref(),
            Resource::Policy(p) => p.resource_ref(),
        }
    }

    /// Resources that must be `Applied` before this one may be attempted
    ///
    /// Alternate-exchange and dead-letter references are not dependencies:
    /// the broker accepts them before the target exists.
    pub fn dependencies(&self, vhost: &VirtualHost) -> Vec<ResourceRef> {
        match self {
            Resource::VirtualHost(_) => Vec::new(),
            Resource::Exchange(_) | Resource::Queue(_) | Resource::Policy(_) => {
                vec![vhost.resource_ref()]
            }
            Resource::Binding(b) => vec![
                vhost.resource_ref(),
                ResourceRef::exchange(&b.source_exchange),
                ResourceRef::queue(&b.destination_queue),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_ref_name() {
        let r = ResourceRef::binding("platform.dlx", "platform.dead-letters", "#");
        assert_eq!(r.name, "platform.dlx -> platform.dead-letters [#]");
        assert_eq!(r.to_string(), "binding 'platform.dlx -> platform.dead-letters [#]'");
    }

    #[test]
    fn test_bindings_with_the_same_name_stay_distinct() {
        let left = ResourceRef::binding("a -> b", "c", "k");
        let right = ResourceRef::binding("a", "b -> c", "k");

        assert_eq!(left.name, right.name);
        assert_ne!(left, right);
    }

    #[test]
    fn test_kind_order_matches_provisioning_order() {
        let mut kinds = ResourceKind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }

    #[test]
    fn test_binding_dependencies() {
        let vhost = VirtualHost::new("/");
        let binding = Resource::Binding(Binding::new("orders", "orders.audit", "order.*"));
        assert_eq!(
            binding.dependencies(&vhost),
            vec![
                ResourceRef::vhost("/"),
                ResourceRef::exchange("orders"),
                ResourceRef::queue("orders.audit"),
            ]
        );
        assert!(Resource::VirtualHost(vhost.clone())
            .dependencies(&vhost)
            .is_empty());
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! A topology is validated as a whole before any network call is made, so
//! a bad declaration never leaves the broker half-provisioned.
//!
//! # Invariant Categories
//!
//! 1. **Names**: broker naming rules for every declared resource
//! 2. **Uniqueness**: one declaration per name and kind (bindings: per triple)
//! 3. **References**: bindings, alternate exchanges and dead-letter clauses
//!    only name declared resources
//! 4. **Dead-letter queue**: the DLQ must not dead-letter itself, and the
//!    DLX must be a topic or fanout exchange bound to the DLQ with `#`
//! 5. **Limits**: TTL and max-length are positive
//! 6. **Policies**: patterns compile and definitions are non-empty
//!
//! Validation stops at the first violation.

use regex::Regex;
use std::collections::HashSet;

use super::{check_name, Binding, ExchangeKind, ResourceKind, ResourceRef, Topology, CATCH_ALL};
use crate::errors::{ValidationError, ViolationKind};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validate a topology before it is applied
pub fn validate(topology: &Topology) -> ValidationResult {
    validate_names(topology)?;
    validate_uniqueness(topology)?;
    validate_references(topology)?;
    validate_dead_letter_queue(topology)?;
    validate_limits(topology)?;
    validate_policies(topology)
}

fn validate_names(topology: &Topology) -> ValidationResult {
    let names = std::iter::once((ResourceKind::VirtualHost, topology.vhost.name.as_str()))
        .chain(topology.exchanges.iter().map(|e| (ResourceKind::Exchange, e.name.as_str())))
        .chain(topology.queues.iter().map(|q| (ResourceKind::Queue, q.name.as_str())))
        .chain(topology.policies.iter().map(|p| (ResourceKind::Policy, p.name.as_str())));

    for (kind, name) in names {
        check_name(kind, name).map_err(|e| {
            ValidationError::new(ViolationKind::InvalidName, kind, name, e.to_string())
        })?;
    }
    Ok(())
}

fn validate_uniqueness(topology: &Topology) -> ValidationResult {
    unique(ResourceKind::Exchange, topology.exchanges.iter().map(|e| e.name.as_str()))?;
    unique(ResourceKind::Queue, topology.queues.iter().map(|q| q.name.as_str()))?;
    unique(ResourceKind::Policy, topology.policies.iter().map(|p| p.name.as_str()))?;

    let mut seen: HashSet<&Binding> = HashSet::new();
    for binding in &topology.bindings {
        if !seen.insert(binding) {
            return Err(ValidationError::new(
                ViolationKind::DuplicateName,
                ResourceKind::Binding,
                binding.resource_ref().name,
                "binding declared more than once",
            ));
        }
    }
    Ok(())
}

fn unique<'a>(kind: ResourceKind, names: impl Iterator<Item = &'a str>) -> ValidationResult {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ValidationError::new(
                ViolationKind::DuplicateName,
                kind,
                name,
                format!("{kind} declared more than once"),
            ));
        }
    }
    Ok(())
}

fn validate_references(topology: &Topology) -> ValidationResult {
    let exchanges: HashSet<&str> = topology.exchanges.iter().map(|e| e.name.as_str()).collect();
    let queues: HashSet<&str> = topology.queues.iter().map(|q| q.name.as_str()).collect();

    let missing_exchange = |name: &str, referrer: String| -> ValidationResult {
        if exchanges.contains(name) {
            Ok(())
        } else {
            Err(ValidationError::new(
                ViolationKind::UnresolvedReference,
                ResourceKind::Exchange,
                name,
                format!("undeclared exchange referenced by {referrer}"),
            ))
        }
    };
    let missing_queue = |name: &str, referrer: String| -> ValidationResult {
        if queues.contains(name) {
            Ok(())
        } else {
            Err(ValidationError::new(
                ViolationKind::UnresolvedReference,
                ResourceKind::Queue,
                name,
                format!("undeclared queue referenced by {referrer}"),
            ))
        }
    };

    for exchange in &topology.exchanges {
        if let Some(alternate) = &exchange.alternate_exchange {
            missing_exchange(alternate.as_str(), format!("alternate exchange of {}", exchange.resource_ref()))?;
        }
    }

    for queue in &topology.queues {
        if let Some(dead_letter) = &queue.dead_letter {
            missing_exchange(dead_letter.exchange.as_str(), format!("dead-letter clause of {}", queue.resource_ref()))?;
        }
    }

    for binding in &topology.bindings {
        missing_exchange(binding.source_exchange.as_str(), binding.resource_ref().to_string())?;
        missing_queue(binding.destination_queue.as_str(), binding.resource_ref().to_string())?;
    }

    if let Some(target) = &topology.dead_letter {
        missing_exchange(target.exchange.as_str(), "the dead-letter target".to_string())?;
        missing_queue(target.queue.as_str(), "the dead-letter target".to_string())?;
    }

    Ok(())
}

fn validate_dead_letter_queue(topology: &Topology) -> ValidationResult {
    let Some(target) = &topology.dead_letter else {
        return Ok(());
    };

    match topology.find_queue(&target.queue) {
        Some(queue) if queue.dead_letter.is_some() => Err(ValidationError::new(
            ViolationKind::SelfDeadLetter,
            ResourceKind::Queue,
            &queue.name,
            "the dead-letter queue must not declare a dead-letter clause",
        )),
        _ => Ok(()),
    }?;

    let Some(dlx) = topology.find_exchange(&target.exchange) else {
        return Ok(());
    };
    let catch_all = match dlx.kind {
        ExchangeKind::Topic => topology.bindings.iter().any(|b| {
            b.source_exchange == target.exchange
                && b.destination_queue == target.queue
                && b.routing_key == CATCH_ALL
        }),
        ExchangeKind::Fanout => topology
            .bindings
            .iter()
            .any(|b| b.source_exchange == target.exchange && b.destination_queue == target.queue),
        ExchangeKind::Direct => {
            return Err(ValidationError::new(
                ViolationKind::MissingCatchAll,
                ResourceKind::Exchange,
                &dlx.name,
                "the dead-letter exchange must be a topic or fanout exchange",
            ));
        }
    };

    if catch_all {
        Ok(())
    } else {
        Err(ValidationError::new(
            ViolationKind::MissingCatchAll,
            ResourceKind::Binding,
            ResourceRef::binding(&target.exchange, &target.queue, CATCH_ALL).name,
            "the dead-letter queue must be bound to the dead-letter exchange with '#'",
        ))
    }
}

fn validate_limits(topology: &Topology) -> ValidationResult {
    for queue in &topology.queues {
        if queue.message_ttl_ms == Some(0) {
            return Err(ValidationError::new(
                ViolationKind::NonPositiveLimit,
                ResourceKind::Queue,
                &queue.name,
                "message TTL must be positive",
            ));
        }
        if queue.max_length == Some(0) {
            return Err(ValidationError::new(
                ViolationKind::NonPositiveLimit,
                ResourceKind::Queue,
                &queue.name,
                "max length must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_policies(topology: &Topology) -> ValidationResult {
    for policy in &topology.policies {
        if let Err(e) = Regex::new(&policy.pattern) {
            return Err(ValidationError::new(
                ViolationKind::InvalidPolicy,
                ResourceKind::Policy,
                &policy.name,
                format!("pattern does not compile: {e}"),
            ));
        }
        if policy.definition.is_empty() {
            return Err(ValidationError::new(
                ViolationKind::InvalidPolicy,
                ResourceKind::Policy,
                &policy.name,
                "definition is empty",
            ));
        }
    }
    Ok(())
}

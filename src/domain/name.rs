// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Name Invariants
//!
//! Broker resource names travel as percent-encoded path segments of the
//! management API, so the only hard limits are the broker's own:
//! - Non-empty
//! - At most 255 bytes (AMQP short string)
//! - No control characters
//! - Exchanges and queues may not use the reserved `amq.` prefix

use thiserror::Error;

use super::ResourceKind;

/// Maximum length of a broker resource name (AMQP short string)
pub const MAX_NAME_LENGTH: usize = 255;

/// Prefix the broker reserves for its own exchanges and queues
pub const RESERVED_PREFIX: &str = "amq.";

/// Name validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name exceeds maximum length of 255 bytes: {0}")]
    TooLong(usize),

    #[error("control character {0:?} in name")]
    ControlCharacter(char),

    #[error("the 'amq.' prefix is reserved by the broker")]
    Reserved,
}

/// Check a resource name against the broker's naming rules
///
/// # Examples
///
/// ```rust
/// use cim_broker_topology::domain::{check_name, ResourceKind};
///
/// assert!(check_name(ResourceKind::Queue, "orders.created").is_ok());
/// assert!(check_name(ResourceKind::VirtualHost, "/").is_ok());
/// assert!(check_name(ResourceKind::Exchange, "amq.topic").is_err());
/// ```
pub fn check_name(kind: ResourceKind, name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(NameError::TooLong(name.len()));
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(NameError::ControlCharacter(ch));
    }

    let reserved_applies = matches!(kind, ResourceKind::Exchange | ResourceKind::Queue);
    if reserved_applies && name.starts_with(RESERVED_PREFIX) {
        return Err(NameError::Reserved);
    }

    Ok(())
}

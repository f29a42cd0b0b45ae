// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology provisioning
//!
//! Provisioning distinguishes errors that abort a whole run from errors that
//! belong to a single resource:
//!
//! - [`ValidationError`] - bad topology, raised before any network call
//! - [`TimeoutError`] - broker never became ready, raised before any `ensure_*` call
//! - [`ConflictError`] - an existing resource differs from its declaration
//! - [`TopologyError::Connectivity`] - broker unreachable after retries
//!
//! Per-resource errors are collected into the
//! [`ApplyReport`](crate::report::ApplyReport) instead of aborting the run.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::domain::ResourceKind;

/// What kind of rule a topology violates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A binding, alternate exchange or dead-letter clause names an undeclared resource
    UnresolvedReference,
    /// Two resources of the same kind share a name
    DuplicateName,
    /// The dead-letter queue dead-letters into something itself
    SelfDeadLetter,
    /// The dead-letter exchange cannot route every message into the dead-letter queue
    MissingCatchAll,
    /// A TTL or max-length is zero
    NonPositiveLimit,
    /// A name is empty, too long, reserved or contains control characters
    InvalidName,
    /// A policy pattern or definition is unusable
    InvalidPolicy,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ViolationKind::UnresolvedReference => "unresolved reference",
            ViolationKind::DuplicateName => "duplicate name",
            ViolationKind::SelfDeadLetter => "dead-letter loop",
            ViolationKind::MissingCatchAll => "missing catch-all",
            ViolationKind::NonPositiveLimit => "non-positive limit",
            ViolationKind::InvalidName => "invalid name",
            ViolationKind::InvalidPolicy => "invalid policy",
        };
        f.write_str(label)
    }
}

/// A topology that must not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} for {resource_kind} '{resource_name}': {detail}")]
pub struct ValidationError {
    pub kind: ViolationKind,
    pub resource_kind: ResourceKind,
    /// For unresolved references this is the missing name
    pub resource_name: String,
    pub detail: String,
}

impl ValidationError {
    pub fn new(
        kind: ViolationKind,
        resource_kind: ResourceKind,
        resource_name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            resource_kind,
            resource_name: resource_name.into(),
            detail: detail.into(),
        }
    }
}

/// An existing broker resource whose definition differs from the declared one
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{resource_kind} '{resource_name}' already exists with a different definition: expected {expected}, found {actual}")]
pub struct ConflictError {
    pub resource_kind: ResourceKind,
    pub resource_name: String,
    pub expected: String,
    pub actual: String,
}

/// The broker did not become ready in time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("broker not ready after {elapsed:?} (timeout {timeout:?}, {attempts} probe(s)){}", .last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
pub struct TimeoutError {
    pub timeout: Duration,
    pub elapsed: Duration,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Errors that can occur while provisioning a topology
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Topology failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Existing resource conflicts with its declaration
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Readiness wait exceeded its timeout
    #[error("Timeout: {0}")]
    Timeout(#[from] TimeoutError),

    /// Broker unreachable or answering with server errors
    #[error("Broker unreachable after {attempts} attempt(s): {message}")]
    Connectivity { attempts: u32, message: String },

    /// Broker refused the request with a client error
    #[error("Broker rejected {operation}: HTTP {status}: {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// Not attempted because a resource it depends on failed
    #[error("Skipped: dependency {dependency} failed")]
    DependencyFailed { dependency: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for provisioning operations
pub type TopologyResult<T> = Result<T, TopologyError>;

impl TopologyError {
    /// A single failed round-trip to the broker
    pub fn connectivity(message: impl Into<String>) -> Self {
        TopologyError::Connectivity {
            attempts: 1,
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, TopologyError::Connectivity { .. })
    }

    /// Whether this error aborts the whole provisioning run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TopologyError::Validation(_)
                | TopologyError::Timeout(_)
                | TopologyError::Configuration(_)
        )
    }

    pub(crate) fn with_attempts(self, attempts: u32) -> Self {
        match self {
            TopologyError::Connectivity { message, .. } => {
                TopologyError::Connectivity { attempts, message }
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for TopologyError {
    fn from(err: reqwest::Error) -> Self {
        TopologyError::connectivity(err.to_string())
    }
}

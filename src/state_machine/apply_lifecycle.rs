// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Apply Lifecycle State Machine
//!
//! Tracks one resource through a provisioning run.
//!
//! # States
//!
//! - Pending: scheduled, not yet attempted
//! - Applying: `ensure_*` call in flight
//! - Applied: broker matches the declaration (terminal)
//! - Failed: declaration rejected, conflicting, or skipped (terminal)
//!
//! # Inputs
//!
//! - Begin: Pending → Applying
//! - Succeed: Applying → Applied
//! - Fail: Applying → Failed
//! - Skip: Pending → Failed (a dependency failed)

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Apply state of a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyState {
    Pending,
    Applying,
    Applied,
    Failed,
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApplyState::Pending => "Pending",
            ApplyState::Applying => "Applying",
            ApplyState::Applied => "Applied",
            ApplyState::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Apply lifecycle input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyEvent {
    /// The `ensure_*` call is issued
    Begin,
    /// The broker matches the declaration
    Succeed,
    /// The `ensure_*` call failed
    Fail,
    /// Never attempted because a dependency failed
    Skip,
}

impl StateMachine for ApplyState {
    type Input = ApplyEvent;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use ApplyEvent::*;
        use ApplyState::*;

        match (self, input) {
            (Pending, Begin) => Ok((Applying, ())),
            (Pending, Skip) => Ok((Failed, ())),
            (Applying, Succeed) => Ok((Applied, ())),
            (Applying, Fail) => Ok((Failed, ())),

            (Applied | Failed, _) => Err(TransitionError::Terminal(self.to_string())),

            (Pending, Succeed | Fail) => Err(TransitionError::InvalidTransition {
                from: "Pending".to_string(),
                to: "a result before Applying".to_string(),
            }),
            (Applying, Begin | Skip) => Err(TransitionError::InvalidTransition {
                from: "Applying".to_string(),
                to: format!("{input:?}"),
            }),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ApplyState::Applied | ApplyState::Failed)
    }
}

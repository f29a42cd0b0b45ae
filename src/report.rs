// Copyright (c) 2025 - Cowboy AI, Inc.
//! Apply report
//!
//! Outcome of one provisioning run: which resources reached `Applied`, which
//! of those were newly created, and which failed with what error. A report
//! lists every resource of the plan exactly once, together with the
//! timestamped lifecycle it went through.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::{ResourceKind, ResourceRef};
use crate::errors::TopologyError;
use crate::state_machine::{ApplyEvent, ApplyState, Transition};

/// Counts for one resource kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub applied: usize,
    pub created: usize,
    pub failed: usize,
}

/// Lifecycle of one resource during a run
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTrace {
    pub resource: ResourceRef,
    pub state: ApplyState,
    pub transitions: Vec<Transition<ApplyState, ApplyEvent>>,
}

impl ResourceTrace {
    /// Time from the `ensure_*` call being issued to its result
    ///
    /// `None` for skipped resources, which never reach the broker.
    pub fn elapsed(&self) -> Option<Duration> {
        let began = self
            .transitions
            .iter()
            .find(|t| t.input == ApplyEvent::Begin)?;
        let finished = self.transitions.last()?;
        (finished.input != ApplyEvent::Begin).then(|| finished.timestamp - began.timestamp)
    }
}

/// Result of applying a topology
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    /// Correlates the report with the run's log lines
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Resources that match their declaration, in provisioning order
    pub applied: Vec<ResourceRef>,
    /// Subset of `applied` that did not exist before the run
    pub created: Vec<ResourceRef>,
    /// Resources that failed or were skipped, in provisioning order
    pub failed: Vec<(ResourceRef, TopologyError)>,
    /// Every resource of the plan with its transitions, in provisioning order
    pub traces: Vec<ResourceTrace>,
}

impl ApplyReport {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            applied: Vec::new(),
            created: Vec::new(),
            failed: Vec::new(),
            traces: Vec::new(),
        }
    }

    /// True when every resource was applied
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.applied.len() + self.failed.len()
    }

    pub fn error_for(&self, resource: &ResourceRef) -> Option<&TopologyError> {
        self.failed
            .iter()
            .find(|(r, _)| r == resource)
            .map(|(_, e)| e)
    }

    pub fn trace_for(&self, resource: &ResourceRef) -> Option<&ResourceTrace> {
        self.traces.iter().find(|t| &t.resource == resource)
    }

    /// The resource whose `ensure_*` call took longest
    pub fn slowest(&self) -> Option<(&ResourceRef, Duration)> {
        self.traces
            .iter()
            .filter_map(|t| t.elapsed().map(|elapsed| (&t.resource, elapsed)))
            .max_by_key(|(_, elapsed)| *elapsed)
    }

    /// Per-kind counts, in provisioning order
    pub fn summary(&self) -> BTreeMap<ResourceKind, KindSummary> {
        let mut summary: BTreeMap<ResourceKind, KindSummary> = BTreeMap::new();
        for resource in &self.applied {
            summary.entry(resource.kind).or_default().applied += 1;
        }
        for resource in &self.created {
            summary.entry(resource.kind).or_default().created += 1;
        }
        for (resource, _) in &self.failed {
            summary.entry(resource.kind).or_default().failed += 1;
        }
        summary
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "Run {}: {} applied ({} created), {} failed in {}ms",
            self.run_id,
            self.applied.len(),
            self.created.len(),
            self.failed.len(),
            elapsed.num_milliseconds()
        )?;
        for (kind, counts) in self.summary() {
            writeln!(
                f,
                "  {:<8} applied={} created={} failed={}",
                kind, counts.applied, counts.created, counts.failed
            )?;
        }
        if let Some((resource, elapsed)) = self.slowest() {
            writeln!(f, "  slowest: {} ({}ms)", resource, elapsed.num_milliseconds())?;
        }
        for (resource, error) in &self.failed {
            writeln!(f, "  FAILED {}: {}", resource, error)?;
        }
        Ok(())
    }
}

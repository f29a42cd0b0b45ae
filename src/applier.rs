// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Applier
//!
//! Drives a [`TopologyPlan`] against a broker. Tiers run strictly one after
//! another; resources inside a tier run concurrently, bounded by
//! `concurrency`. Every resource moves through the
//! [`ApplyState`] lifecycle:
//!
//! ```text
//! Pending ──Begin──> Applying ──Succeed──> Applied
//!    │                   └──────Fail─────> Failed
//!    └────────Skip──────────────────────> Failed
//! ```
//!
//! A resource is skipped when any of its dependencies is not `Applied`,
//! so a failed exchange never leads to a binding attempt against it. A
//! failure never aborts the run; it is recorded and the remaining
//! independent resources are still applied.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{BrokerApi, EnsureOutcome};
use crate::domain::{validate, Resource, ResourceRef, Topology, TopologyPlan, VirtualHost};
use crate::errors::{TopologyError, TopologyResult, ValidationError};
use crate::report::{ApplyReport, ResourceTrace};
use crate::state_machine::{ApplyEvent, ApplyState, StateMachine, StateMachineWithHistory};

/// Default number of concurrent `ensure_*` calls within a tier
pub const DEFAULT_CONCURRENCY: usize = 4;

type Lifecycle = StateMachineWithHistory<ApplyState>;

/// Applies topologies to one broker
pub struct Applier<'a, B: ?Sized> {
    broker: &'a B,
    concurrency: usize,
}

impl<'a, B> Applier<'a, B>
where
    B: BrokerApi + ?Sized,
{
    pub fn new(broker: &'a B) -> Self {
        Self {
            broker,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound on concurrent calls within a tier; `0` is treated as `1`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Validate and apply `topology`
    ///
    /// A topology that fails validation is rejected before any broker call.
    pub async fn apply(&self, topology: &Topology) -> Result<ApplyReport, ValidationError> {
        validate(topology)?;
        Ok(self.apply_plan(&topology.plan()).await)
    }

    /// Apply an already planned topology
    ///
    /// The plan must come from a validated topology.
    pub async fn apply_plan(&self, plan: &TopologyPlan) -> ApplyReport {
        let run_id = Uuid::now_v7();
        let span = info_span!("apply", %run_id, vhost = %plan.vhost, broker = self.broker.name());
        self.run(run_id, plan).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, plan: &TopologyPlan) -> ApplyReport {
        let mut report = ApplyReport::new(run_id, Utc::now());
        let order = plan.order();
        info!("Applying {} resources", order.len());

        let mut lifecycles: HashMap<ResourceRef, Lifecycle> = order
            .iter()
            .map(|r| (r.clone(), StateMachineWithHistory::new(ApplyState::Pending)))
            .collect();
        let mut results: HashMap<ResourceRef, TopologyResult<EnsureOutcome>> = HashMap::new();

        for tier in &plan.tiers {
            if tier.resources.is_empty() {
                continue;
            }
            debug!("Tier {}: {} resource(s)", tier.kind, tier.resources.len());

            let mut ready = Vec::new();
            for resource in &tier.resources {
                let reference = resource.resource_ref();
                let blocked = resource
                    .dependencies(&plan.vhost)
                    .into_iter()
                    .find(|dependency| !is_applied(&lifecycles, dependency));

                match blocked {
                    Some(dependency) => {
                        warn!("Skipping {}: dependency {} failed", reference, dependency);
                        advance(&mut lifecycles, &reference, ApplyEvent::Skip);
                        results.insert(
                            reference,
                            Err(TopologyError::DependencyFailed {
                                dependency: dependency.to_string(),
                            }),
                        );
                    }
                    None => {
                        advance(&mut lifecycles, &reference, ApplyEvent::Begin);
                        ready.push(resource);
                    }
                }
            }

            let vhost = &plan.vhost;
            let outcomes: Vec<(ResourceRef, TopologyResult<EnsureOutcome>)> = stream::iter(ready)
                .map(|resource| async move {
                    (resource.resource_ref(), self.ensure(vhost, resource).await)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

            for (reference, outcome) in outcomes {
                match &outcome {
                    Ok(EnsureOutcome::Created) => info!("Created {}", reference),
                    Ok(EnsureOutcome::Unchanged) => debug!("{} already up to date", reference),
                    Err(err) => warn!("Failed to apply {}: {}", reference, err),
                }
                let event = if outcome.is_ok() {
                    ApplyEvent::Succeed
                } else {
                    ApplyEvent::Fail
                };
                advance(&mut lifecycles, &reference, event);
                results.insert(reference, outcome);
            }
        }

        for reference in order {
            if let Some(lifecycle) = lifecycles.remove(&reference) {
                let (state, transitions) = lifecycle.into_parts();
                if !state.is_terminal() {
                    error!("{} finished in state {}", reference, state);
                }
                report.traces.push(ResourceTrace {
                    resource: reference.clone(),
                    state,
                    transitions,
                });
            }
            match results.remove(&reference) {
                Some(Ok(outcome)) => {
                    if outcome == EnsureOutcome::Created {
                        report.created.push(reference.clone());
                    }
                    report.applied.push(reference);
                }
                Some(Err(err)) => report.failed.push((reference, err)),
                None => error!("{} finished without an outcome", reference),
            }
        }
        report.finished_at = Utc::now();

        if report.is_success() {
            info!(
                "Topology applied: {} resources, {} created",
                report.applied.len(),
                report.created.len()
            );
        } else {
            warn!(
                "Topology partially applied: {} of {} resources failed",
                report.failed.len(),
                report.total()
            );
        }
        report
    }

    async fn ensure(&self, vhost: &VirtualHost, resource: &Resource) -> TopologyResult<EnsureOutcome> {
        match resource {
            Resource::VirtualHost(v) => self.broker.ensure_virtual_host(v).await,
            Resource::Exchange(e) => self.broker.ensure_exchange(vhost, e).await,
            Resource::Queue(q) => self.broker.ensure_queue(vhost, q).await,
            Resource::Binding(b) => self.broker.ensure_binding(vhost, b).await,
            Resource::Policy(p) => self.broker.ensure_policy(vhost, p).await,
        }
    }
}

fn is_applied(lifecycles: &HashMap<ResourceRef, Lifecycle>, resource: &ResourceRef) -> bool {
    lifecycles
        .get(resource)
        .is_some_and(|l| *l.current_state() == ApplyState::Applied)
}

fn advance(lifecycles: &mut HashMap<ResourceRef, Lifecycle>, resource: &ResourceRef, event: ApplyEvent) {
    match lifecycles.get_mut(resource) {
        Some(lifecycle) => {
            if let Err(err) = lifecycle.transition_with_history(event, Utc::now()) {
                error!("{}: {}", resource, err);
            }
        }
        None => error!("{} is not part of the plan", resource),
    }
}

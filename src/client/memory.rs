// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory broker
//!
//! A simulated broker with the same `ensure_*` contract as the management
//! API, used for dry runs and tests. On top of the declarative surface it
//! routes published messages through exchanges and bindings so dead-letter
//! paths can be exercised without a real broker:
//!
//! - topic exchanges match binding patterns word by word (`*`, `#`)
//! - direct exchanges match routing keys exactly
//! - fanout exchanges deliver to every bound queue
//! - unroutable messages fall back to the exchange's alternate exchange
//! - rejected messages and messages pushed out by `x-max-length` are
//!   republished to the queue's dead-letter exchange
//!
//! Failures can be injected per resource to exercise partial-failure runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::definitions::{
    exchange_drift, policy_drift, queue_drift, ExchangeDefinition, PolicyDefinition,
    QueueDefinition, ARG_ALTERNATE_EXCHANGE, ARG_DEAD_LETTER_EXCHANGE,
    ARG_DEAD_LETTER_ROUTING_KEY, ARG_MAX_LENGTH,
};
use super::{BrokerApi, EnsureOutcome};
use crate::domain::{
    topic_matches, Binding, Exchange, Policy, Queue, ResourceKind, ResourceRef, VirtualHost,
};
use crate::errors::{TopologyError, TopologyResult};

/// Resources declared in one virtual host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VhostSnapshot {
    pub exchanges: BTreeMap<String, ExchangeDefinition>,
    pub queues: BTreeMap<String, QueueDefinition>,
    /// In declaration order
    pub bindings: Vec<Binding>,
    pub policies: BTreeMap<String, PolicyDefinition>,
}

/// Everything declared on the broker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerSnapshot {
    pub vhosts: BTreeMap<String, VhostSnapshot>,
}

impl BrokerSnapshot {
    pub fn vhost(&self, name: &str) -> Option<&VhostSnapshot> {
        self.vhosts.get(name)
    }
}

/// A message held by a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub routing_key: String,
    pub payload: Vec<u8>,
    /// Queues this message was dead-lettered from, oldest first
    pub deaths: Vec<String>,
}

impl Message {
    pub fn new(routing_key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: payload.into(),
            deaths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Injected {
    /// Permanent refusal, like a 4xx from the management API
    Reject(u16),
    /// Broker unreachable for this call
    Unreachable,
}

#[derive(Debug, Default)]
struct State {
    available: bool,
    vhosts: BTreeMap<String, VhostSnapshot>,
    messages: HashMap<(String, String), VecDeque<Message>>,
    calls: Vec<ResourceRef>,
    injected: HashMap<ResourceRef, Injected>,
}

/// Simulated broker
#[derive(Debug)]
pub struct InMemoryBroker {
    state: Mutex<State>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// An empty, reachable broker
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                available: true,
                ..State::default()
            }),
        }
    }

    /// A broker whose readiness probe always fails
    pub fn unavailable() -> Self {
        let broker = Self::new();
        broker.set_available(false);
        broker
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Make every `ensure_*` call for `resource` fail with HTTP `status`
    pub fn reject(&self, resource: ResourceRef, status: u16) {
        self.lock().injected.insert(resource, Injected::Reject(status));
    }

    /// Make every `ensure_*` call for `resource` fail as unreachable
    pub fn fail_unreachable(&self, resource: ResourceRef) {
        self.lock().injected.insert(resource, Injected::Unreachable);
    }

    pub fn clear_failures(&self) {
        self.lock().injected.clear();
    }

    /// Every `ensure_*` call received, in arrival order
    pub fn ensure_calls(&self) -> Vec<ResourceRef> {
        self.lock().calls.clone()
    }

    pub fn snapshot(&self) -> BrokerSnapshot {
        BrokerSnapshot {
            vhosts: self.lock().vhosts.clone(),
        }
    }

    /// Declare a resource directly, bypassing the `ensure_*` contract
    pub fn seed_queue(&self, vhost: &str, queue: &Queue) {
        self.lock()
            .vhosts
            .entry(vhost.to_string())
            .or_default()
            .queues
            .insert(queue.name.clone(), QueueDefinition::from(queue));
    }

    /// Declare an exchange directly, bypassing the `ensure_*` contract
    pub fn seed_exchange(&self, vhost: &str, exchange: &Exchange) {
        self.lock()
            .vhosts
            .entry(vhost.to_string())
            .or_default()
            .exchanges
            .insert(exchange.name.clone(), ExchangeDefinition::from(exchange));
    }

    /// Publish a message; returns the queues it was delivered to
    pub fn publish(
        &self,
        vhost: &str,
        exchange: &str,
        routing_key: &str,
        payload: impl Into<Vec<u8>>,
    ) -> TopologyResult<Vec<String>> {
        let mut state = self.lock();
        let declared = state
            .vhosts
            .get(vhost)
            .is_some_and(|v| v.exchanges.contains_key(exchange));
        if !declared {
            return Err(not_found("publish", format!("exchange '{exchange}' in vhost '{vhost}'")));
        }
        Ok(deliver(&mut state, vhost, exchange, Message::new(routing_key, payload)))
    }

    /// Reject the oldest message of `queue` without requeueing
    ///
    /// Returns the queues the message was dead-lettered into; empty when
    /// the queue has no dead-letter exchange or was empty.
    pub fn reject_next(&self, vhost: &str, queue: &str) -> TopologyResult<Vec<String>> {
        let mut state = self.lock();
        let key = (vhost.to_string(), queue.to_string());
        let Some(message) = state.messages.get_mut(&key).and_then(VecDeque::pop_front) else {
            return Ok(Vec::new());
        };
        Ok(dead_letter(&mut state, vhost, queue, message))
    }

    /// Messages currently held by `queue`, oldest first
    pub fn messages(&self, vhost: &str, queue: &str) -> Vec<Message> {
        self.lock()
            .messages
            .get(&(vhost.to_string(), queue.to_string()))
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record the call and apply any injected failure
    fn enter(&self, resource: ResourceRef) -> TopologyResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        if !state.available {
            return Err(TopologyError::connectivity("broker unavailable"));
        }
        state.calls.push(resource.clone());
        let injected = state.injected.get(&resource).cloned();
        match injected {
            Some(Injected::Reject(status)) => Err(TopologyError::Rejected {
                operation: resource.to_string(),
                status,
                message: "rejected by broker".to_string(),
            }),
            Some(Injected::Unreachable) => Err(TopologyError::connectivity(format!(
                "connection reset while declaring {resource}"
            ))),
            None => Ok(state),
        }
    }
}

fn not_found(operation: &str, what: String) -> TopologyError {
    TopologyError::Rejected {
        operation: operation.to_string(),
        status: 404,
        message: format!("{what} not found"),
    }
}

fn vhost_mut<'a>(state: &'a mut State, vhost: &VirtualHost) -> TopologyResult<&'a mut VhostSnapshot> {
    state
        .vhosts
        .get_mut(&vhost.name)
        .ok_or_else(|| not_found("declare", format!("vhost '{}'", vhost.name)))
}

fn string_argument<'a>(arguments: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

/// Route `message` from `exchange`; returns the queues it landed in
fn deliver(state: &mut State, vhost: &str, exchange: &str, message: Message) -> Vec<String> {
    let mut visited = BTreeSet::new();
    let mut current = exchange.to_string();

    let targets = loop {
        if !visited.insert(current.clone()) {
            break Vec::new();
        }
        let Some(snapshot) = state.vhosts.get(vhost) else {
            break Vec::new();
        };
        let Some(definition) = snapshot.exchanges.get(&current) else {
            break Vec::new();
        };

        let mut targets: Vec<String> = Vec::new();
        for binding in snapshot.bindings.iter().filter(|b| b.source_exchange == current) {
            let matched = match definition.kind.as_str() {
                "topic" => topic_matches(&binding.routing_key, &message.routing_key),
                "fanout" => true,
                _ => binding.routing_key == message.routing_key,
            };
            if matched && !targets.contains(&binding.destination_queue) {
                targets.push(binding.destination_queue.clone());
            }
        }

        if !targets.is_empty() {
            break targets;
        }
        match string_argument(&definition.arguments, ARG_ALTERNATE_EXCHANGE) {
            Some(alternate) => current = alternate.to_string(),
            None => break Vec::new(),
        }
    };

    if targets.is_empty() {
        debug!("Dropped unroutable message '{}' from {}", message.routing_key, exchange);
    }

    let mut delivered = Vec::new();
    for queue in targets {
        delivered.push(queue.clone());
        enqueue(state, vhost, &queue, message.clone());
    }
    delivered
}

fn enqueue(state: &mut State, vhost: &str, queue: &str, message: Message) {
    let max_length = state
        .vhosts
        .get(vhost)
        .and_then(|v| v.queues.get(queue))
        .and_then(|q| q.arguments.get(ARG_MAX_LENGTH))
        .and_then(Value::as_u64);

    let key = (vhost.to_string(), queue.to_string());
    let held = state.messages.entry(key).or_default();
    held.push_back(message);

    if let Some(max) = max_length {
        let mut overflow = Vec::new();
        while held.len() as u64 > max {
            if let Some(head) = held.pop_front() {
                overflow.push(head);
            }
        }
        for head in overflow {
            dead_letter(state, vhost, queue, head);
        }
    }
}

/// Republish `message` to the dead-letter exchange of `queue`
fn dead_letter(state: &mut State, vhost: &str, queue: &str, mut message: Message) -> Vec<String> {
    // A message dead-lettered from the same queue twice is in a cycle
    if message.deaths.iter().any(|q| q == queue) {
        return Vec::new();
    }

    let Some(arguments) = state
        .vhosts
        .get(vhost)
        .and_then(|v| v.queues.get(queue))
        .map(|q| q.arguments.clone())
    else {
        return Vec::new();
    };
    let Some(exchange) = string_argument(&arguments, ARG_DEAD_LETTER_EXCHANGE) else {
        return Vec::new();
    };

    if let Some(routing_key) = string_argument(&arguments, ARG_DEAD_LETTER_ROUTING_KEY) {
        message.routing_key = routing_key.to_string();
    }
    message.deaths.push(queue.to_string());
    deliver(state, vhost, exchange, message)
}

#[async_trait]
impl BrokerApi for InMemoryBroker {
    async fn probe(&self) -> TopologyResult<()> {
        if self.lock().available {
            Ok(())
        } else {
            Err(TopologyError::connectivity("broker unavailable"))
        }
    }

    async fn ensure_virtual_host(&self, vhost: &VirtualHost) -> TopologyResult<EnsureOutcome> {
        let mut state = self.enter(vhost.resource_ref())?;
        if state.vhosts.contains_key(&vhost.name) {
            return Ok(EnsureOutcome::Unchanged);
        }
        state.vhosts.insert(vhost.name.clone(), VhostSnapshot::default());
        Ok(EnsureOutcome::Created)
    }

    async fn ensure_exchange(
        &self,
        vhost: &VirtualHost,
        exchange: &Exchange,
    ) -> TopologyResult<EnsureOutcome> {
        let mut state = self.enter(exchange.resource_ref())?;
        let snapshot = vhost_mut(&mut state, vhost)?;
        let desired = ExchangeDefinition::from(exchange);

        match snapshot.exchanges.get(&exchange.name) {
            Some(actual) => {
                exchange_drift(&desired, actual).into_result(ResourceKind::Exchange, &exchange.name)?;
                Ok(EnsureOutcome::Unchanged)
            }
            None => {
                snapshot.exchanges.insert(exchange.name.clone(), desired);
                Ok(EnsureOutcome::Created)
            }
        }
    }

    async fn ensure_queue(&self, vhost: &VirtualHost, queue: &Queue) -> TopologyResult<EnsureOutcome> {
        let mut state = self.enter(queue.resource_ref())?;
        let snapshot = vhost_mut(&mut state, vhost)?;
        let desired = QueueDefinition::from(queue);

        match snapshot.queues.get(&queue.name) {
            Some(actual) => {
                queue_drift(&desired, actual).into_result(ResourceKind::Queue, &queue.name)?;
                Ok(EnsureOutcome::Unchanged)
            }
            None => {
                snapshot.queues.insert(queue.name.clone(), desired);
                Ok(EnsureOutcome::Created)
            }
        }
    }

    async fn ensure_binding(
        &self,
        vhost: &VirtualHost,
        binding: &Binding,
    ) -> TopologyResult<EnsureOutcome> {
        let mut state = self.enter(binding.resource_ref())?;
        let snapshot = vhost_mut(&mut state, vhost)?;

        if !snapshot.exchanges.contains_key(&binding.source_exchange) {
            return Err(not_found(
                "bind",
                format!("exchange '{}'", binding.source_exchange),
            ));
        }
        if !snapshot.queues.contains_key(&binding.destination_queue) {
            return Err(not_found(
                "bind",
                format!("queue '{}'", binding.destination_queue),
            ));
        }
        if snapshot.bindings.contains(binding) {
            return Ok(EnsureOutcome::Unchanged);
        }
        snapshot.bindings.push(binding.clone());
        Ok(EnsureOutcome::Created)
    }

    async fn ensure_policy(
        &self,
        vhost: &VirtualHost,
        policy: &Policy,
    ) -> TopologyResult<EnsureOutcome> {
        let mut state = self.enter(policy.resource_ref())?;
        let snapshot = vhost_mut(&mut state, vhost)?;
        let desired = PolicyDefinition::from(policy);

        match snapshot.policies.get(&policy.name) {
            Some(actual) => {
                policy_drift(&desired, actual).into_result(ResourceKind::Policy, &policy.name)?;
                Ok(EnsureOutcome::Unchanged)
            }
            None => {
                snapshot.policies.insert(policy.name.clone(), desired);
                Ok(EnsureOutcome::Created)
            }
        }
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

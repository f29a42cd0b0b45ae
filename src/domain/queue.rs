// Copyright (c) 2025 - Cowboy AI, Inc.
//! Queue declarations

use serde::{Deserialize, Serialize};

use super::exchange::default_durable;
use super::ResourceRef;

/// Where a queue sends messages that are rejected, expire or overflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub exchange: String,
    /// Empty keeps the message's original routing key
    #[serde(default)]
    pub routing_key: String,
}

impl DeadLetter {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }

    /// Dead-letter to `exchange` keeping the original routing key
    pub fn to_exchange(exchange: impl Into<String>) -> Self {
        Self::new(exchange, "")
    }
}

/// A declared queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub name: String,
    #[serde(default = "default_durable")]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ttl_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter: Option<DeadLetter>,
}

impl Queue {
    /// A durable, non-auto-delete queue without limits
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            auto_delete: false,
            message_ttl_ms: None,
            max_length: None,
            dead_letter: None,
        }
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    pub fn with_message_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.message_ttl_ms = Some(ttl_ms);
        self
    }

    pub fn with_max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_dead_letter(mut self, dead_letter: DeadLetter) -> Self {
        self.dead_letter = Some(dead_letter);
        self
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::queue(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_builder() {
        let queue = Queue::new("orders.audit")
            .with_message_ttl_ms(60_000)
            .with_max_length(10)
            .with_dead_letter(DeadLetter::new("platform.dlx", "orders.audit"));

        assert!(queue.durable);
        assert_eq!(queue.message_ttl_ms, Some(60_000));
        assert_eq!(queue.max_length, Some(10));
        assert_eq!(
            queue.dead_letter.as_ref().map(|d| d.exchange.as_str()),
            Some("platform.dlx")
        );
    }

    #[test]
    fn test_queue_document() {
        let queue: Queue = serde_json::from_str(
            r#"{"name": "billing", "messageTtlMs": 1000, "deadLetter": {"exchange": "dlx"}}"#,
        )
        .unwrap();
        assert_eq!(queue.message_ttl_ms, Some(1000));
        assert_eq!(queue.dead_letter, Some(DeadLetter::to_exchange("dlx")));
    }
}

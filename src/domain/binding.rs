// Copyright (c) 2025 - Cowboy AI, Inc.
//! Binding declarations and topic routing-key matching

use serde::{Deserialize, Serialize};

use super::ResourceRef;

/// Catch-all topic pattern
pub const CATCH_ALL: &str = "#";

/// A rule routing messages from an exchange to a queue
///
/// Bindings are identified by the full `(source, destination, routing_key)`
/// triple; the same pair may be bound several times with different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub source_exchange: String,
    pub destination_queue: String,
    #[serde(default)]
    pub routing_key: String,
}

impl Binding {
    pub fn new(
        source_exchange: impl Into<String>,
        destination_queue: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            source_exchange: source_exchange.into(),
            destination_queue: destination_queue.into(),
            routing_key: routing_key.into(),
        }
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::binding(
            &self.source_exchange,
            &self.destination_queue,
            &self.routing_key,
        )
    }
}

/// Match a routing key against a topic binding pattern
///
/// Both are split into dot-separated words. `*` matches exactly one word,
/// `#` matches zero or more words.
///
/// ```rust
/// use cim_broker_topology::domain::topic_matches;
///
/// assert!(topic_matches("order.*", "order.created"));
/// assert!(topic_matches("order.#", "order"));
/// assert!(!topic_matches("order.*", "order.line.added"));
/// ```
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && match_words(rest, &key[1..]),
        Some((word, rest)) => key.first() == Some(word) && match_words(rest, &key[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_words() {
        assert!(topic_matches("order.created", "order.created"));
        assert!(!topic_matches("order.created", "order.updated"));
        assert!(!topic_matches("order", "order.created"));
    }

    #[test]
    fn test_star_matches_one_word() {
        assert!(topic_matches("*.created", "invoice.created"));
        assert!(!topic_matches("*.created", "created"));
        assert!(!topic_matches("*.created", "billing.invoice.created"));
    }

    #[test]
    fn test_hash_matches_any_number_of_words() {
        assert!(topic_matches(CATCH_ALL, ""));
        assert!(topic_matches(CATCH_ALL, "a.b.c"));
        assert!(topic_matches("billing.#", "billing"));
        assert!(topic_matches("billing.#.failed", "billing.invoice.payment.failed"));
        assert!(!topic_matches("billing.#", "shipping.label"));
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Topic Matching
//!
//! Routing keys and patterns are dot-separated words; `*` matches exactly
//! one word and `#` matches zero or more.

use cim_broker_topology::domain::topic_matches;
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

/// A routing key of one or more words
fn routing_key() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(word(), 1..6)
}

fn join(words: &[String]) -> String {
    words.join(".")
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: a key always matches itself
    #[test]
    fn prop_key_matches_itself(key in routing_key()) {
        let key = join(&key);
        prop_assert!(topic_matches(&key, &key));
    }

    /// Property: `#` alone matches every key
    #[test]
    fn prop_hash_matches_everything(key in routing_key()) {
        prop_assert!(topic_matches("#", &join(&key)));
    }

    /// Property: `*` stands for exactly one word
    ///
    /// Replacing any single word of a key by `*` still matches the key but
    /// no longer matches the key with one word added.
    #[test]
    fn prop_star_replaces_exactly_one_word(key in routing_key(), index in any::<prop::sample::Index>(), extra in word()) {
        let position = index.index(key.len());
        let mut pattern = key.clone();
        pattern[position] = "*".to_string();

        prop_assert!(topic_matches(&join(&pattern), &join(&key)));

        let mut longer = key.clone();
        longer.insert(position, extra);
        prop_assert!(!topic_matches(&join(&pattern), &join(&longer)));
    }

    /// Property: `prefix.#` matches the prefix itself and any extension of it
    #[test]
    fn prop_trailing_hash_matches_extensions(prefix in routing_key(), suffix in prop::collection::vec(word(), 0..4)) {
        let pattern = format!("{}.#", join(&prefix));
        let mut key = prefix.clone();
        key.extend(suffix);

        prop_assert!(topic_matches(&pattern, &join(&key)));
    }

    /// Property: a pattern without wildcards matches only the identical key
    #[test]
    fn prop_literal_pattern_is_equality(pattern in routing_key(), key in routing_key()) {
        prop_assert_eq!(
            topic_matches(&join(&pattern), &join(&key)),
            pattern == key
        );
    }

    /// Property: a pattern with `*` words only matches keys of the same length
    #[test]
    fn prop_star_only_pattern_checks_length(words in 1usize..6, key in routing_key()) {
        let pattern = vec!["*"; words].join(".");
        prop_assert_eq!(topic_matches(&pattern, &join(&key)), key.len() == words);
    }
}

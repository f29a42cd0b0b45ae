// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Topic routing-key matching and topology planning.

mod plan_ordering;
mod topic_matching;

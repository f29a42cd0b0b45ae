// Copyright (c) 2025 - Cowboy AI, Inc.
//! Exchange declarations

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ResourceRef;

/// Routing semantics of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Routing key matched against binding patterns with `*` and `#` wildcards
    Topic,
    /// Routing key matched exactly
    Direct,
    /// Every bound queue receives every message
    Fanout,
}

impl ExchangeKind {
    /// Name used by the broker's management API
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Topic => "topic",
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub name: String,
    pub kind: ExchangeKind,
    #[serde(default = "default_durable")]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    /// Receives messages this exchange cannot route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_exchange: Option<String>,
}

pub(crate) fn default_durable() -> bool {
    true
}

impl Exchange {
    /// A durable, non-auto-delete exchange
    pub fn new(name: impl Into<String>, kind: ExchangeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            durable: true,
            auto_delete: false,
            alternate_exchange: None,
        }
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(name, ExchangeKind::Topic)
    }

    pub fn direct(name: impl Into<String>) -> Self {
        Self::new(name, ExchangeKind::Direct)
    }

    pub fn fanout(name: impl Into<String>) -> Self {
        Self::new(name, ExchangeKind::Fanout)
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    pub fn with_alternate_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.alternate_exchange = Some(exchange.into());
        self
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::exchange(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_defaults() {
        let exchange = Exchange::topic("domain.events");
        assert_eq!(exchange.kind, ExchangeKind::Topic);
        assert!(exchange.durable);
        assert!(!exchange.auto_delete);
        assert_eq!(exchange.alternate_exchange, None);
    }

    #[test]
    fn test_exchange_document_defaults() {
        let exchange: Exchange =
            serde_json::from_str(r#"{"name": "commands", "kind": "direct"}"#).unwrap();
        assert_eq!(exchange, Exchange::direct("commands"));

        let with_ae: Exchange = serde_json::from_str(
            r#"{"name": "events", "kind": "topic", "durable": false, "alternateExchange": "dlx"}"#,
        )
        .unwrap();
        assert!(!with_ae.durable);
        assert_eq!(with_ae.alternate_exchange.as_deref(), Some("dlx"));
    }
}

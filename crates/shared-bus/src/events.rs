//! # Notification Events
//!
//! Defines the topics subscribers bind to and the envelope every published
//! event is wrapped in.

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;

/// A subscription topic.
///
/// Topics are typed so an address and a location with the same text never
/// land in the same log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub enum Topic {
    /// Everything owned by (or addressed to) an address or script.
    Address(String),
    /// Every state of one logical jig.
    Origin(String),
    /// Every instance of one contract class.
    Kind(String),
    /// Every update of one channel.
    Channel(String),
    /// Messages posted in one conversation context.
    Context(String),
    /// Messages posted about one subject.
    Subject(String),
}

impl Topic {
    const ADDRESS: &'static str = "address";
    const ORIGIN: &'static str = "origin";
    const KIND: &'static str = "kind";
    const CHANNEL: &'static str = "channel";
    const CONTEXT: &'static str = "context";
    const SUBJECT: &'static str = "subject";

    pub fn address(value: impl Into<String>) -> Self {
        Self::Address(value.into())
    }

    pub fn origin(value: impl ToString) -> Self {
        Self::Origin(value.to_string())
    }

    pub fn kind(value: impl Into<String>) -> Self {
        Self::Kind(value.into())
    }

    pub fn channel(value: impl ToString) -> Self {
        Self::Channel(value.to_string())
    }

    pub fn context(value: impl Into<String>) -> Self {
        Self::Context(value.into())
    }

    pub fn subject(value: impl Into<String>) -> Self {
        Self::Subject(value.into())
    }

    /// The topic value without its namespace.
    pub fn value(&self) -> &str {
        match self {
            Self::Address(v)
            | Self::Origin(v)
            | Self::Kind(v)
            | Self::Channel(v)
            | Self::Context(v)
            | Self::Subject(v) => v,
        }
    }

    fn namespace(&self) -> &'static str {
        match self {
            Self::Address(_) => Self::ADDRESS,
            Self::Origin(_) => Self::ORIGIN,
            Self::Kind(_) => Self::KIND,
            Self::Channel(_) => Self::CHANNEL,
            Self::Context(_) => Self::CONTEXT,
            Self::Subject(_) => Self::SUBJECT,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.value())
    }
}

/// Error parsing a topic string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid topic: {0:?}")]
pub struct TopicParseError(pub String);

impl FromStr for Topic {
    type Err = TopicParseError;

    /// Parses `namespace:value`. A string without a known namespace is an
    /// address topic, which is what wallets subscribe with.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TopicParseError(s.to_string()));
        }
        let topic = match s.split_once(':') {
            Some((Self::ADDRESS, v)) => Self::Address(v.to_string()),
            Some((Self::ORIGIN, v)) => Self::Origin(v.to_string()),
            Some((Self::KIND, v)) => Self::Kind(v.to_string()),
            Some((Self::CHANNEL, v)) => Self::Channel(v.to_string()),
            Some((Self::CONTEXT, v)) => Self::Context(v.to_string()),
            Some((Self::SUBJECT, v)) => Self::Subject(v.to_string()),
            _ => Self::Address(s.to_string()),
        };
        if topic.value().is_empty() {
            return Err(TopicParseError(s.to_string()));
        }
        Ok(topic)
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A UTXO was created.
    Utxo,
    /// A UTXO was spent.
    Spent,
    /// A jig record was indexed.
    Jig,
    /// A channel record was indexed.
    Channel,
    /// A message was relayed.
    #[serde(rename = "msg")]
    Message,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utxo => "utxo",
            Self::Spent => "spent",
            Self::Jig => "jig",
            Self::Channel => "channel",
            Self::Message => "msg",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Process-wide, strictly increasing.
    pub sequence: u64,
    pub topic: Topic,
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

//! # Message Relay Service

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_bus::{EventPublisher, EventType, Topic};
use shared_types::{now_millis, Message};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{MessageStore, RelayError, RelayResult};
use crate::ports::MessageRelayApi;

/// Default number of messages kept for `get`.
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Messages kept before the oldest is evicted.
    pub max_messages: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

pub struct MessageRelay {
    store: RwLock<MessageStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl MessageRelay {
    pub fn new(config: &RelayConfig, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store: RwLock::new(MessageStore::new(config.max_messages)),
            publisher,
        }
    }

    /// Messages currently stored.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }
}

/// Each topic once, in the order first named.
fn topics(message: &Message) -> Vec<Topic> {
    let subject = (!message.subject.is_empty()).then(|| Topic::subject(message.subject.clone()));
    let mut seen = HashSet::new();
    message
        .to
        .iter()
        .map(|to| Topic::address(to.clone()))
        .chain(message.context.iter().map(|context| Topic::context(context.clone())))
        .chain(subject)
        .filter(|topic| seen.insert(topic.clone()))
        .collect()
}

fn validate(message: &Message) -> RelayResult<()> {
    if message.to.iter().any(String::is_empty) {
        return Err(RelayError::InvalidMessage("empty recipient".into()));
    }
    if message.context.iter().any(String::is_empty) {
        return Err(RelayError::InvalidMessage("empty context".into()));
    }
    Ok(())
}

#[async_trait]
impl MessageRelayApi for MessageRelay {
    #[instrument(skip_all, fields(id = %message.id))]
    async fn post(&self, mut message: Message) -> RelayResult<Message> {
        validate(&message)?;
        if message.id.is_empty() {
            message.id = Uuid::now_v7().to_string();
        }
        if message.ts == 0 {
            message.ts = now_millis();
        }
        let payload = serde_json::to_value(&message)
            .map_err(|e| RelayError::InvalidMessage(e.to_string()))?;
        let topics = topics(&message);

        let mut store = self.store.write();
        if let Some(evicted) = store.insert(message.clone()) {
            debug!(evicted = %evicted, "Message store full, evicted oldest");
        }
        for topic in &topics {
            self.publisher
                .publish(topic.clone(), EventType::Message, payload.clone());
        }
        drop(store);

        debug!(id = %message.id, topics = topics.len(), "Relayed message");
        Ok(message)
    }

    async fn get(&self, id: &str) -> RelayResult<Message> {
        self.store
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RelayError::NotFound { id: id.to_string() })
    }
}

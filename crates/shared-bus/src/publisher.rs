//! # Event Publisher
//!
//! Defines the publishing side of the notification bus and the bus itself.
//!
//! ## State
//!
//! All bus state sits behind one lock:
//!
//! ```text
//! BusState
//! ├── last_sequence            global counter, assigned on publish
//! ├── topics: Topic → TopicState
//! │     ├── log                most recent events on the topic (bounded)
//! │     ├── evicted_through    highest sequence trimmed from the log
//! │     └── subscribers        subscription id → bounded sink
//! └── subscriptions: id → [Topic]
//! ```
//!
//! `publish` and `subscribe` both take the lock, so a subscription's replay
//! cursor and its live registration are captured in the same critical
//! section. An event is either in the replayed backlog or delivered live,
//! never both and never neither.

use crate::events::{EventType, NotificationEvent, Topic};
use crate::subscriber::Subscription;
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_TOPIC_RETENTION};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Trait for publishing events to the bus.
///
/// This is the interface the indexer uses to emit notifications.
pub trait EventPublisher: Send + Sync {
    /// Publish an event and return the sequence number assigned to it.
    fn publish(&self, topic: Topic, event_type: EventType, payload: serde_json::Value) -> u64;

    /// The highest sequence number assigned so far, `0` before any publish.
    fn last_sequence(&self) -> u64;
}

/// Bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Live events buffered per subscription before it is disconnected.
    pub channel_capacity: usize,
    /// Events retained per topic for replay.
    pub retention: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            retention: DEFAULT_TOPIC_RETENTION,
        }
    }
}

/// Point-in-time bus statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStats {
    pub events_published: u64,
    pub last_sequence: u64,
    pub subscriber_count: usize,
    pub topic_count: usize,
}

pub(crate) type Sink = mpsc::Sender<Arc<NotificationEvent>>;

#[derive(Default)]
struct TopicState {
    log: VecDeque<Arc<NotificationEvent>>,
    evicted_through: u64,
    subscribers: HashMap<u64, Sink>,
}

#[derive(Default)]
pub(crate) struct BusState {
    last_sequence: u64,
    next_subscription_id: u64,
    events_published: u64,
    topics: HashMap<Topic, TopicState>,
    subscriptions: HashMap<u64, Vec<Topic>>,
}

impl BusState {
    /// Remove a subscription from every topic it is bound to.
    ///
    /// Dropping the last sender closes the subscriber's channel, so its
    /// stream ends once the already-buffered events are drained.
    pub(crate) fn detach(&mut self, id: u64) -> bool {
        let Some(topics) = self.subscriptions.remove(&id) else {
            return false;
        };
        for topic in &topics {
            if let Some(state) = self.topics.get_mut(topic) {
                state.subscribers.remove(&id);
            }
        }
        true
    }
}

/// In-memory, topic-keyed notification bus.
///
/// Cheap to share behind an `Arc`; every operation is synchronous and holds
/// the lock only for bookkeeping, never across an await.
pub struct NotificationBus {
    state: Arc<Mutex<BusState>>,
    config: BusConfig,
}

impl NotificationBus {
    /// Create a bus with default capacity and retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            config,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Subscribe to one or more topics with a single sink.
    ///
    /// When `after` is given, every retained event on those topics with a
    /// greater sequence is queued for replay, in sequence order, ahead of
    /// live delivery.
    #[must_use]
    pub fn subscribe(&self, topics: &[Topic], after: Option<u64>) -> Subscription {
        let mut topics = topics.to_vec();
        topics.sort();
        topics.dedup();

        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let mut state = self.state.lock();

        let mut backlog = Vec::new();
        let mut replay_truncated = false;
        if let Some(after) = after {
            for topic in &topics {
                let Some(topic_state) = state.topics.get(topic) else {
                    continue;
                };
                if topic_state.evicted_through > after {
                    replay_truncated = true;
                }
                backlog.extend(
                    topic_state
                        .log
                        .iter()
                        .filter(|event| event.sequence > after)
                        .cloned(),
                );
            }
            backlog.sort_by_key(|event| event.sequence);
            backlog.dedup_by_key(|event| event.sequence);
        }

        state.next_subscription_id += 1;
        let id = state.next_subscription_id;
        for topic in &topics {
            state
                .topics
                .entry(topic.clone())
                .or_default()
                .subscribers
                .insert(id, sender.clone());
        }
        state.subscriptions.insert(id, topics.clone());
        drop(state);

        if replay_truncated {
            warn!(
                subscription = id,
                after = ?after,
                "Replay requested beyond retained window; older events are gone"
            );
        }
        debug!(
            subscription = id,
            topics = ?topics,
            replayed = backlog.len(),
            "Subscription registered"
        );

        Subscription::new(
            id,
            topics,
            backlog.into(),
            receiver,
            Arc::downgrade(&self.state),
            replay_truncated,
        )
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.state.lock().detach(id);
        if removed {
            debug!(subscription = id, "Subscription removed");
        }
        removed
    }

    /// Retained events on `topic` with a sequence greater than `after`.
    pub fn events_since(&self, topic: &Topic, after: u64) -> Vec<Arc<NotificationEvent>> {
        let state = self.state.lock();
        state
            .topics
            .get(topic)
            .map(|topic_state| {
                topic_state
                    .log
                    .iter()
                    .filter(|event| event.sequence > after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        let state = self.state.lock();
        BusStats {
            events_published: state.events_published,
            last_sequence: state.last_sequence,
            subscriber_count: state.subscriptions.len(),
            topic_count: state.topics.len(),
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for NotificationBus {
    fn publish(&self, topic: Topic, event_type: EventType, payload: serde_json::Value) -> u64 {
        let mut state = self.state.lock();
        state.last_sequence += 1;
        state.events_published += 1;
        let sequence = state.last_sequence;

        let event = Arc::new(NotificationEvent {
            sequence,
            topic: topic.clone(),
            event_type,
            payload,
        });

        let retention = self.config.retention;
        let topic_state = state.topics.entry(topic.clone()).or_default();
        topic_state.log.push_back(Arc::clone(&event));
        while topic_state.log.len() > retention {
            if let Some(evicted) = topic_state.log.pop_front() {
                topic_state.evicted_through = evicted.sequence;
            }
        }

        let mut overflowed = Vec::new();
        let mut closed = Vec::new();
        for (id, sink) in &topic_state.subscribers {
            match sink.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => overflowed.push(*id),
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        let delivered = topic_state.subscribers.len() - overflowed.len() - closed.len();

        for id in overflowed {
            state.detach(id);
            warn!(
                subscription = id,
                topic = %topic,
                sequence,
                "Subscriber fell behind; disconnected"
            );
        }
        for id in closed {
            state.detach(id);
            debug!(subscription = id, topic = %topic, "Removed closed subscriber");
        }

        debug!(
            topic = %topic,
            event_type = %event_type,
            sequence,
            receivers = delivered,
            "Event published"
        );
        sequence
    }

    fn last_sequence(&self) -> u64 {
        self.state.lock().last_sequence
    }
}

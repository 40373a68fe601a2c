//! # Event Subscriber
//!
//! Defines the subscription side of the notification bus.
//!
//! A `Subscription` yields its replayed backlog first and then live events
//! from its bounded channel. Dropping it unregisters it from the bus.

use crate::events::{NotificationEvent, Topic};
use crate::publisher::BusState;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscription was removed from the bus, or the bus was dropped.
    #[error("Subscription closed")]
    Closed,
}

/// A subscription handle for receiving events.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    id: u64,
    topics: Vec<Topic>,
    /// Events captured at registration time, in sequence order.
    backlog: VecDeque<Arc<NotificationEvent>>,
    receiver: mpsc::Receiver<Arc<NotificationEvent>>,
    bus: Weak<Mutex<BusState>>,
    replay_truncated: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        topics: Vec<Topic>,
        backlog: VecDeque<Arc<NotificationEvent>>,
        receiver: mpsc::Receiver<Arc<NotificationEvent>>,
        bus: Weak<Mutex<BusState>>,
        replay_truncated: bool,
    ) -> Self {
        Self {
            id,
            topics,
            backlog,
            receiver,
            bus,
            replay_truncated,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Topics this subscription is bound to, deduplicated and sorted.
    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// True when the requested replay point was older than the retained log.
    #[must_use]
    pub fn replay_truncated(&self) -> bool {
        self.replay_truncated
    }

    /// Receive the next event.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next event, backlog first
    /// - `None` - The subscription was removed (unsubscribed, disconnected
    ///   for falling behind, or the bus was dropped)
    pub async fn recv(&mut self) -> Option<Arc<NotificationEvent>> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        self.receiver.recv().await
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The subscription was removed
    pub fn try_recv(&mut self) -> Result<Option<Arc<NotificationEvent>>, SubscriptionError> {
        if let Some(event) = self.backlog.pop_front() {
            return Ok(Some(event));
        }
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Unregister from the bus. Events already buffered can still be read.
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
        debug!(subscription = self.id, "Subscription dropped");
    }
}

impl Stream for Subscription {
    type Item = Arc<NotificationEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(event) = self.backlog.pop_front() {
            return Poll::Ready(Some(event));
        }
        self.receiver.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topics", &self.topics)
            .field("backlog", &self.backlog.len())
            .field("replay_truncated", &self.replay_truncated)
            .finish()
    }
}

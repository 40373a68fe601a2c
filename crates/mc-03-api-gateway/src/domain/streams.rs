//! Registry of open streaming connections.
//!
//! Every SSE stream and WebSocket connection registers here for its
//! lifetime. `GET /streams` and `GET /health` read from it; the bus itself
//! owns the subscriptions.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Connection ID for one open stream.
///
/// Uses UUID v7 so IDs sort by open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamTransport {
    Sse,
    WebSocket,
}

/// One open stream as reported by `GET /streams`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: ConnectionId,
    pub transport: StreamTransport,
    pub topics: Vec<String>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct StreamRegistry {
    streams: DashMap<ConnectionId, StreamInfo>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream. It stays listed until the guard is dropped.
    pub fn open(
        self: &Arc<Self>,
        transport: StreamTransport,
        topics: Vec<String>,
    ) -> StreamGuard {
        let id = ConnectionId::new();
        info!(
            connection_id = %id,
            transport = ?transport,
            topics = ?topics,
            "Stream opened"
        );
        self.streams.insert(
            id,
            StreamInfo {
                id,
                transport,
                topics,
                opened_at: Utc::now(),
            },
        );
        StreamGuard {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Replace the topics listed for a stream.
    pub fn set_topics(&self, id: &ConnectionId, topics: Vec<String>) {
        if let Some(mut entry) = self.streams.get_mut(id) {
            entry.topics = topics;
        }
    }

    fn close(&self, id: &ConnectionId) {
        if self.streams.remove(id).is_some() {
            info!(connection_id = %id, "Stream closed");
        } else {
            debug!(connection_id = %id, "Stream already closed");
        }
    }

    /// Open streams, oldest first.
    pub fn list(&self) -> Vec<StreamInfo> {
        let mut streams: Vec<StreamInfo> = self.streams.iter().map(|r| r.clone()).collect();
        streams.sort_by_key(|s| (s.opened_at, s.id.0));
        streams
    }

    pub fn count(&self) -> usize {
        self.streams.len()
    }
}

/// Keeps a stream listed in its registry while alive.
pub struct StreamGuard {
    registry: Arc<StreamRegistry>,
    id: ConnectionId,
}

impl StreamGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn set_topics(&self, topics: Vec<String>) {
        self.registry.set_topics(&self.id, topics);
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.registry.close(&self.id);
    }
}

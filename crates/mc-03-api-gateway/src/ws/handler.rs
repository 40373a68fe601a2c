//! WebSocket handler for topic subscriptions.
//!
//! Client messages:
//!
//! ```json
//! {"action": "subscribe", "channelId": "address:mh5C...", "lastEventId": 12}
//! {"action": "unsubscribe", "channelId": "address:mh5C..."}
//! ```
//!
//! Server messages:
//!
//! ```json
//! {"id": 13, "channel": "address:mh5C...", "event": "utxo", "data": {...}}
//! {"action": "subscribed", "channelId": "address:mh5C..."}
//! {"action": "closed", "channelId": "address:mh5C..."}
//! {"error": "..."}
//! ```
//!
//! `closed` means the bus dropped the subscription for falling behind; the
//! client resubscribes with the last `id` it saw.
//!
//! Security features:
//! - Message size limits
//! - Connection-level subscription limits
//! - Rate limiting per connection

use crate::domain::{StreamConfig, StreamGuard, StreamRegistry, StreamTransport};
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use shared_bus::{NotificationBus, NotificationEvent, Topic};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_stream::StreamMap;
use tracing::{debug, error, info, warn};

/// `None` marks the end of a subscription the bus closed.
type TopicStream = BoxStream<'static, Option<Arc<NotificationEvent>>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientMessage {
    action: String,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    last_event_id: Option<SequenceMarker>,
}

/// Browsers hand back `lastEventId` as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SequenceMarker {
    Number(u64),
    Text(String),
}

impl SequenceMarker {
    fn value(&self) -> Result<u64, String> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("Invalid lastEventId: {s}")),
        }
    }
}

/// WebSocket connection handler
pub struct WebSocketHandler {
    bus: Arc<NotificationBus>,
    registry: Arc<StreamRegistry>,
    config: StreamConfig,
    subscriptions: StreamMap<Topic, TopicStream>,
    /// Message counter for rate limiting
    message_count: u32,
    /// Rate limit window start
    rate_limit_window: Instant,
}

impl WebSocketHandler {
    pub fn new(
        bus: Arc<NotificationBus>,
        registry: Arc<StreamRegistry>,
        config: StreamConfig,
    ) -> Self {
        Self {
            bus,
            registry,
            config,
            subscriptions: StreamMap::new(),
            message_count: 0,
            rate_limit_window: Instant::now(),
        }
    }

    /// Check rate limit, returns true if request is allowed
    fn check_rate_limit(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.rate_limit_window) >= Duration::from_secs(1) {
            self.rate_limit_window = now;
            self.message_count = 0;
        }

        self.message_count += 1;
        self.message_count <= self.config.max_messages_per_second
    }

    /// Check message size, returns error response if too large
    fn check_message_size(&self, guard: &StreamGuard, size: usize) -> Option<String> {
        if size > self.config.max_message_size {
            warn!(
                connection_id = %guard.id(),
                size = size,
                max = self.config.max_message_size,
                "Message exceeds size limit"
            );
            Some(ws_error(&format!(
                "Message too large: {} bytes (max: {})",
                size, self.config.max_message_size
            )))
        } else {
            None
        }
    }

    /// Handle a WebSocket connection until either side closes it or the
    /// gateway shuts down.
    pub async fn handle(mut self, mut socket: WebSocket, mut shutdown: watch::Receiver<bool>) {
        let guard = self.registry.open(StreamTransport::WebSocket, Vec::new());
        info!(connection_id = %guard.id(), "New WebSocket connection");

        let mut ping = tokio::time::interval(self.config.ping_interval);
        ping.tick().await;

        loop {
            tokio::select! {
                inbound = socket.recv() => {
                    let Some(result) = inbound else { break };
                    let reply = match result {
                        Ok(Message::Text(text)) => self.on_text(&guard, &text),
                        Ok(Message::Binary(data)) => match String::from_utf8(data) {
                            Ok(text) => self.on_text(&guard, &text),
                            Err(_) => Some(ws_error("Binary messages must be UTF-8 JSON")),
                        },
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                            None
                        }
                        Ok(Message::Pong(_)) => None,
                        Ok(Message::Close(_)) => {
                            debug!(connection_id = %guard.id(), "WebSocket close received");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    };
                    if let Some(reply) = reply {
                        if let Err(e) = socket.send(Message::Text(reply)).await {
                            error!(error = %e, "Failed to send WebSocket response");
                            break;
                        }
                    }
                }
                Some((topic, delivered)) = self.subscriptions.next(), if !self.subscriptions.is_empty() => {
                    let message = match delivered {
                        Some(event) => ws_event(&event),
                        None => {
                            warn!(connection_id = %guard.id(), topic = %topic, "Subscription closed by bus");
                            self.subscriptions.remove(&topic);
                            guard.set_topics(self.topic_names());
                            ws_ack("closed", &topic)
                        }
                    };
                    if let Err(e) = socket.send(Message::Text(message)).await {
                        debug!(error = %e, "Failed to push event, closing connection");
                        break;
                    }
                }
                _ = ping.tick() => {
                    if let Err(e) = socket.send(Message::Ping(Vec::new())).await {
                        debug!(error = %e, "Failed to send ping");
                        break;
                    }
                }
                _ = async { let _ = shutdown.wait_for(|stopping| *stopping).await; } => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        // Dropping the streams unsubscribes them from the bus.
        self.subscriptions.clear();
        info!(connection_id = %guard.id(), "WebSocket connection closed");
    }

    /// Handle one client message. Returns the reply, if any.
    fn on_text(&mut self, guard: &StreamGuard, text: &str) -> Option<String> {
        if let Some(error_response) = self.check_message_size(guard, text.len()) {
            return Some(error_response);
        }
        if !self.check_rate_limit() {
            return Some(ws_error("Rate limit exceeded"));
        }

        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => return Some(ws_error(&format!("Parse error: {e}"))),
        };
        let Some(channel_id) = message.channel_id.as_deref() else {
            return Some(ws_error("Missing channelId"));
        };
        let topic: Topic = match channel_id.parse() {
            Ok(t) => t,
            Err(e) => return Some(ws_error(&format!("Invalid channelId: {e}"))),
        };

        let reply = match message.action.as_str() {
            "subscribe" => {
                let after = match message.last_event_id.as_ref().map(SequenceMarker::value) {
                    Some(Err(e)) => return Some(ws_error(&e)),
                    Some(Ok(n)) => Some(n),
                    None => None,
                };
                self.subscribe(guard, topic, after)
            }
            "unsubscribe" => {
                let removed = self.subscriptions.remove(&topic).is_some();
                debug!(connection_id = %guard.id(), topic = %topic, removed, "Unsubscribed");
                ws_ack("unsubscribed", &topic)
            }
            other => ws_error(&format!("Unknown action: {other}")),
        };
        guard.set_topics(self.topic_names());
        Some(reply)
    }

    /// Subscribing again to a topic replaces the earlier subscription, so a
    /// client can rewind it with a new `lastEventId`.
    fn subscribe(&mut self, guard: &StreamGuard, topic: Topic, after: Option<u64>) -> String {
        if !self.subscriptions.contains_key(&topic)
            && self.subscriptions.len() >= self.config.max_subscriptions_per_connection
        {
            return ws_error(&format!(
                "Too many subscriptions (max: {})",
                self.config.max_subscriptions_per_connection
            ));
        }

        let subscription = self.bus.subscribe(std::slice::from_ref(&topic), after);
        let stream: TopicStream = subscription
            .map(Some)
            .chain(stream::once(async { None }))
            .boxed();
        self.subscriptions.insert(topic.clone(), stream);

        debug!(
            connection_id = %guard.id(),
            topic = %topic,
            after = ?after,
            "Subscribed"
        );
        ws_ack("subscribed", &topic)
    }

    fn topic_names(&self) -> Vec<String> {
        self.subscriptions.keys().map(ToString::to_string).collect()
    }
}

/// Event push message
fn ws_event(event: &NotificationEvent) -> String {
    json!({
        "id": event.sequence,
        "channel": event.topic,
        "event": event.event_type,
        "data": event.payload,
    })
    .to_string()
}

/// Subscription state change
fn ws_ack(action: &str, topic: &Topic) -> String {
    json!({
        "action": action,
        "channelId": topic,
    })
    .to_string()
}

fn ws_error(message: &str) -> String {
    json!({ "error": message }).to_string()
}

//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::Message;

use crate::domain::RelayResult;

/// Primary Message Relay API.
#[async_trait]
pub trait MessageRelayApi: Send + Sync {
    /// Store `message` and publish it to its recipients, contexts and
    /// subject. A missing id is generated and a zero `ts` is stamped.
    /// Posting an id again replaces the stored message and publishes again.
    ///
    /// # Errors
    /// * `InvalidMessage` - an empty recipient or context
    async fn post(&self, message: Message) -> RelayResult<Message>;

    /// # Errors
    /// * `NotFound` - never posted, or evicted
    async fn get(&self, id: &str) -> RelayResult<Message>;
}

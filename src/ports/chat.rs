//! Chat Handler Port
//!
//! Front-ends (the Slack webhook, the generic message endpoint, the CLI)
//! hand every inbound message to a `ChatHandler` and relay whatever
//! reply it produces.

use async_trait::async_trait;

use crate::domain::CommandRequest;

/// Trait for turning one inbound chat message into at most one reply
#[async_trait]
pub trait ChatHandler: Send + Sync {
    /// Handle one inbound message
    ///
    /// # Returns
    /// The reply text, or `None` when the message is dropped silently
    async fn handle(&self, request: CommandRequest) -> Option<String>;
}

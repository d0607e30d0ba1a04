// # Chat Channel Trait
//
// Defines the chat platform operations the Reconciler needs.
//
// ## Implementations
//
// - Discord REST API: `ipbeacon-discord` crate
//
// ## Usage
//
// ```rust,ignore
// use ipbeacon_core::ChatChannel;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let channel = /* ChatChannel implementation */;
//     channel.open().await?;
//
//     let sent = channel.send_message("123", "hello").await?;
//     channel.pin_message("123", &sent.id).await?;
//
//     channel.close().await?;
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A message as returned by the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// Platform-assigned message ID
    pub id: String,
    /// Message text
    pub content: String,
}

impl ChannelMessage {
    /// Create a message value
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Trait for chat platform implementations
///
/// Implementations wrap one authenticated session and must be usable from
/// the Poller's background task.
///
/// ## Allowed Capabilities
/// - ✅ Perform API calls to the platform's endpoints
/// - ✅ Map platform responses to [`ChannelMessage`] values
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (the Poller's next interval is the retry)
/// - ❌ Decide which message is the status message (owned by `Reconciler`)
/// - ❌ Log credentials
///
/// Failures should be reported as `Error::Platform` (or `Error::Connection`
/// for `open`/`close`); the Reconciler re-tags them with the failing step.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Open the session and verify credentials
    async fn open(&self) -> Result<(), crate::Error>;

    /// Close the session
    ///
    /// Closing an already closed session is a no-op.
    async fn close(&self) -> Result<(), crate::Error>;

    /// List the pinned messages of a channel
    ///
    /// Messages are returned in the order the platform reports them.
    async fn pinned_messages(&self, channel_id: &str)
    -> Result<Vec<ChannelMessage>, crate::Error>;

    /// Post a new message
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<ChannelMessage, crate::Error>;

    /// Replace the content of an existing message
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<ChannelMessage, crate::Error>;

    /// Pin a message in its channel
    async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<(), crate::Error>;

    /// Get the platform name (for logging/debugging)
    fn platform_name(&self) -> &'static str;
}

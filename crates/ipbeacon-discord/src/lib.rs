// # Discord Chat Channel
//
// This crate provides the Discord implementation of `ChatChannel` for ipbeacon,
// built on serenity.
//
// ## Implementation Notes
//
// - `open()` verifies the bot token over REST, then starts a gateway client
//   and waits for READY; `close()` shuts the shards down and can fail
// - Every message operation is one serenity `Http` call; no retry, no caching
// - Specific error messages for 401/403, 404, 429 and 5xx
// - Mentions are disabled on everything we post so an IP change never pings
//
// ## Security Requirements
//
// - Bot token NEVER appears in logs or `Debug` output
// - Empty token is a configuration error

mod gateway;
mod rest;

use async_trait::async_trait;
use ipbeacon_core::traits::{ChannelMessage, ChatChannel};
use ipbeacon_core::{Error, Result};
use tokio::sync::Mutex;

use gateway::GatewaySession;
use rest::DiscordRest;

const PLATFORM: &str = "discord";

/// Discord chat channel
///
/// The Debug implementation intentionally does NOT expose the bot token.
pub struct DiscordChannel {
    /// Bot token without the `Bot ` prefix
    /// ⚠️ NEVER log this value
    token: String,

    rest: DiscordRest,

    /// Gateway session while open
    session: Mutex<Option<GatewaySession>>,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for DiscordChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = self.session.try_lock().map(|s| s.is_some()).ok();
        f.debug_struct("DiscordChannel")
            .field("token", &"<REDACTED>")
            .field("open", &open)
            .finish()
    }
}

impl DiscordChannel {
    /// Create a new Discord channel client
    ///
    /// # Parameters
    ///
    /// - `token`: Bot token, with or without the leading `Bot `
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the token is empty
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let raw = token.into();
        let raw = raw.trim_start();
        let token = raw.strip_prefix("Bot ").unwrap_or(raw).trim().to_string();

        if token.is_empty() {
            return Err(Error::config("Discord bot token cannot be empty"));
        }

        let rest = DiscordRest::new(&token);
        Ok(Self {
            token,
            rest,
            session: Mutex::new(None),
        })
    }

    /// Send REST traffic through `proxy` instead of discord.com
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.rest = DiscordRest::with_proxy(&self.token, proxy);
        self
    }

    /// Whether a gateway session is running
    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn ensure_open(&self) -> Result<()> {
        if self.is_open().await {
            Ok(())
        } else {
            Err(Error::connection("Discord session is not open"))
        }
    }
}

#[async_trait]
impl ChatChannel for DiscordChannel {
    async fn open(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let name = self
            .rest
            .current_user()
            .await
            .map_err(|e| Error::connection(e.to_string()))?;

        *session = Some(GatewaySession::connect(&self.token).await?);
        tracing::info!("Connected to Discord as {}", name);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        session.shutdown().await?;
        tracing::info!("Discord session closed");
        Ok(())
    }

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<ChannelMessage>> {
        self.ensure_open().await?;
        self.rest.pinned_messages(channel_id).await
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChannelMessage> {
        self.ensure_open().await?;
        self.rest.send_message(channel_id, content).await
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<ChannelMessage> {
        self.ensure_open().await?;
        self.rest.edit_message(channel_id, message_id, content).await
    }

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.ensure_open().await?;
        self.rest.pin_message(channel_id, message_id).await
    }

    fn platform_name(&self) -> &'static str {
        PLATFORM
    }
}

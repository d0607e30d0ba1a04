// REST half of the Discord channel: one serenity `Http` call per operation.

use ipbeacon_core::traits::ChannelMessage;
use ipbeacon_core::{Error, Result};
use serenity::Error as SerenityError;
use serenity::builder::{CreateAllowedMentions, CreateMessage, EditMessage};
use serenity::http::{Http, HttpBuilder};
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId};
use std::sync::Arc;

use crate::PLATFORM;

/// Thin wrapper over serenity's HTTP client
pub(crate) struct DiscordRest {
    http: Arc<Http>,
}

impl DiscordRest {
    pub(crate) fn new(token: &str) -> Self {
        Self {
            http: Arc::new(HttpBuilder::new(token).build()),
        }
    }

    /// Route every request through `proxy` instead of discord.com.
    ///
    /// serenity's ratelimiter is off here so a 429 surfaces as an error
    /// rather than being waited out.
    pub(crate) fn with_proxy(token: &str, proxy: &str) -> Self {
        let http = HttpBuilder::new(token)
            .proxy(proxy.trim_end_matches('/'))
            .ratelimiter_disabled(true)
            .build();
        Self {
            http: Arc::new(http),
        }
    }

    /// Name of the bot account the token belongs to
    pub(crate) async fn current_user(&self) -> Result<String> {
        let user = self
            .http
            .get_current_user()
            .await
            .map_err(|e| platform_error("verify bot token", e))?;
        Ok(user.name.clone())
    }

    pub(crate) async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<ChannelMessage>> {
        let channel = parse_channel_id(channel_id)?;
        let pins = channel
            .pins(&*self.http)
            .await
            .map_err(|e| platform_error("list pinned messages", e))?;

        Ok(pins.into_iter().map(to_channel_message).collect())
    }

    pub(crate) async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChannelMessage> {
        let channel = parse_channel_id(channel_id)?;
        let builder = CreateMessage::new()
            .content(content)
            .allowed_mentions(CreateAllowedMentions::new());

        let message = channel
            .send_message(&*self.http, builder)
            .await
            .map_err(|e| platform_error("send message", e))?;

        Ok(to_channel_message(message))
    }

    pub(crate) async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<ChannelMessage> {
        let channel = parse_channel_id(channel_id)?;
        let message = parse_message_id(message_id)?;
        let builder = EditMessage::new()
            .content(content)
            .allowed_mentions(CreateAllowedMentions::new());

        let edited = channel
            .edit_message(&*self.http, message, builder)
            .await
            .map_err(|e| platform_error("edit message", e))?;

        Ok(to_channel_message(edited))
    }

    pub(crate) async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let channel = parse_channel_id(channel_id)?;
        let message = parse_message_id(message_id)?;

        channel
            .pin(&*self.http, message)
            .await
            .map_err(|e| platform_error("pin message", e))
    }
}

fn to_channel_message(message: Message) -> ChannelMessage {
    ChannelMessage::new(message.id.to_string(), message.content)
}

/// Discord snowflakes are non-zero u64s
fn parse_snowflake(kind: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| Error::platform(PLATFORM, format!("Invalid {} ID: {:?}", kind, raw)))
}

fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    parse_snowflake("channel", raw).map(ChannelId::new)
}

fn parse_message_id(raw: &str) -> Result<MessageId> {
    parse_snowflake("message", raw).map(MessageId::new)
}

/// Map a serenity failure to an error naming the operation
pub(crate) fn platform_error(operation: &str, err: SerenityError) -> Error {
    let status = match &err {
        SerenityError::Http(http) => http.status_code().map(|s| s.as_u16()),
        _ => None,
    };

    Error::platform(PLATFORM, status_message(operation, status, &err.to_string()))
}

fn status_message(operation: &str, status: Option<u16>, detail: &str) -> String {
    match status {
        Some(code @ (401 | 403)) => format!(
            "{}: Authentication failed: invalid bot token or missing channel permissions. Status: {}",
            operation, code
        ),
        Some(404) => format!("{}: Unknown channel or message: {}", operation, detail),
        Some(429) => format!("{}: Rate limited: {}", operation, detail),
        Some(code @ 500..=599) => format!(
            "{}: Discord server error (transient): {} - {}",
            operation, code, detail
        ),
        Some(code) => format!("{} failed: {} - {}", operation, code, detail),
        None => format!("{} failed: {}", operation, detail),
    }
}

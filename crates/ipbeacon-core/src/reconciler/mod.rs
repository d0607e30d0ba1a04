//! Status message reconciliation
//!
//! The Reconciler makes a channel's pinned status message show a given IP
//! and posts a one-shot change announcement.
//!
//! ## Step Flow
//!
//! ```text
//! Start ─► PinnedMessagesFetched ─┬─► MessageFound ──► Edited ──────────┬─► AnnouncementSent ─► Done
//!                                 └─► MessageNotFound ► Sent ─► Pinned ─┘
//! ```
//!
//! Any failing step aborts the remaining ones. The error names the step.
//!
//! ## Multiple Matches
//!
//! When more than one pinned message carries [`STATUS_MARKER`], only the first
//! in platform order is edited. The others are left as they are.

use crate::error::{Error, Result};
use crate::traits::{ChannelMessage, ChatChannel};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Substring that identifies the pinned status message
pub const STATUS_MARKER: &str = "Current IP Address:";

/// Content of the pinned status message for `ip`
pub fn status_content(ip: IpAddr) -> String {
    format!("{STATUS_MARKER} `{ip}`")
}

/// Content of the change announcement for `ip`
pub fn announcement_content(ip: IpAddr) -> String {
    format!("IP Address has changed to `{ip}`")
}

/// First message whose content contains [`STATUS_MARKER`]
pub fn find_status_message(pinned: &[ChannelMessage]) -> Option<&ChannelMessage> {
    pinned.iter().find(|m| m.content.contains(STATUS_MARKER))
}

/// What happened to the status message during a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// An existing pinned status message was edited
    Edited {
        /// ID of the edited message
        message_id: String,
    },
    /// No status message was pinned, so one was sent and pinned
    Created {
        /// ID of the new message
        message_id: String,
    },
}

impl StatusOutcome {
    /// ID of the authoritative status message
    pub fn message_id(&self) -> &str {
        match self {
            StatusOutcome::Edited { message_id } | StatusOutcome::Created { message_id } => {
                message_id
            }
        }
    }
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Status message outcome
    pub status: StatusOutcome,
    /// ID of the change announcement
    pub announcement_id: String,
}

/// Brings a channel's visible state in line with a newly observed IP
pub struct Reconciler {
    channel: Arc<dyn ChatChannel>,
}

impl Reconciler {
    /// Create a reconciler on top of a chat channel
    pub fn new(channel: Arc<dyn ChatChannel>) -> Self {
        Self { channel }
    }

    /// Make `channel_id`'s pinned status message show `new_ip` and announce the change
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: Status message is current and the announcement was posted
    /// - `Err(Error)`: One of `PinnedLookup`, `Edit`, `Send`, `Pin` or `Announce`
    pub async fn reconcile(&self, channel_id: &str, new_ip: IpAddr) -> Result<ReconcileReport> {
        let pinned = self
            .channel
            .pinned_messages(channel_id)
            .await
            .map_err(|e| Error::pinned_lookup(e.to_string()))?;
        debug!(
            "Fetched {} pinned message(s) in channel {}",
            pinned.len(),
            channel_id
        );

        let matches = pinned
            .iter()
            .filter(|m| m.content.contains(STATUS_MARKER))
            .count();
        if matches > 1 {
            warn!(
                "{} pinned status messages in channel {}, only the first is updated",
                matches, channel_id
            );
        }

        let status = match find_status_message(&pinned) {
            Some(existing) => self.edit_status(channel_id, &existing.id, new_ip).await?,
            None => self.create_status(channel_id, new_ip).await?,
        };

        let announcement = self
            .channel
            .send_message(channel_id, &announcement_content(new_ip))
            .await
            .map_err(|e| Error::announce(e.to_string()))?;
        debug!("Posted change announcement {}", announcement.id);

        info!(
            "Channel {} now shows {} (status message {})",
            channel_id,
            new_ip,
            status.message_id()
        );

        Ok(ReconcileReport {
            status,
            announcement_id: announcement.id,
        })
    }

    async fn edit_status(
        &self,
        channel_id: &str,
        message_id: &str,
        new_ip: IpAddr,
    ) -> Result<StatusOutcome> {
        let edited = self
            .channel
            .edit_message(channel_id, message_id, &status_content(new_ip))
            .await
            .map_err(|e| Error::edit(e.to_string()))?;
        debug!("Edited pinned status message {}", edited.id);

        Ok(StatusOutcome::Edited {
            message_id: edited.id,
        })
    }

    async fn create_status(&self, channel_id: &str, new_ip: IpAddr) -> Result<StatusOutcome> {
        debug!("No pinned status message in channel {}, creating one", channel_id);

        let sent = self
            .channel
            .send_message(channel_id, &status_content(new_ip))
            .await
            .map_err(|e| Error::send(e.to_string()))?;

        self.channel
            .pin_message(channel_id, &sent.id)
            .await
            .map_err(|e| Error::pin(e.to_string()))?;
        debug!("Sent and pinned status message {}", sent.id);

        Ok(StatusOutcome::Created {
            message_id: sent.id,
        })
    }
}

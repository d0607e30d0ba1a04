//! Error types for ipbeacon
//!
//! Reconciliation failures are tagged with the step that failed so the
//! Poller's logs say what went wrong without a backtrace.

use thiserror::Error;

/// Result type alias for ipbeacon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ipbeacon
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// External IP could not be fetched
    #[error("Network error: {0}")]
    Network(String),

    /// Chat session could not be opened or closed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Listing the channel's pinned messages failed
    #[error("Failed to fetch pinned messages: {0}")]
    PinnedLookup(String),

    /// Posting a new status message failed
    #[error("Failed to send status message: {0}")]
    Send(String),

    /// Editing the existing pinned status message failed
    #[error("Failed to edit pinned status message: {0}")]
    Edit(String),

    /// Pinning a freshly sent status message failed
    #[error("Failed to pin status message: {0}")]
    Pin(String),

    /// Posting the change announcement failed
    #[error("Failed to send change announcement: {0}")]
    Announce(String),

    /// Raw chat platform failure, before the Reconciler tags it with a step
    #[error("Platform error ({platform}): {message}")]
    Platform {
        /// Platform name
        platform: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a pinned-message lookup error
    pub fn pinned_lookup(msg: impl Into<String>) -> Self {
        Self::PinnedLookup(msg.into())
    }

    /// Create a send error
    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    /// Create an edit error
    pub fn edit(msg: impl Into<String>) -> Self {
        Self::Edit(msg.into())
    }

    /// Create a pin error
    pub fn pin(msg: impl Into<String>) -> Self {
        Self::Pin(msg.into())
    }

    /// Create an announcement error
    pub fn announce(msg: impl Into<String>) -> Self {
        Self::Announce(msg.into())
    }

    /// Create a platform-specific error
    pub fn platform(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Platform {
            platform: platform.into(),
            message: message.into(),
        }
    }

    /// Whether this error came out of a reconciliation step
    pub fn is_reconcile_failure(&self) -> bool {
        matches!(
            self,
            Self::PinnedLookup(_) | Self::Send(_) | Self::Edit(_) | Self::Pin(_) | Self::Announce(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

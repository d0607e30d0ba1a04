//! Core traits for ipbeacon
//!
//! This module defines the abstract interfaces the Poller and Reconciler depend on.
//!
//! - [`IpSource`]: Fetch the host's external IP address
//! - [`ChatChannel`]: Chat platform operations used for the status message

pub mod ip_source;
pub mod chat_channel;

pub use ip_source::IpSource;
pub use chat_channel::{ChannelMessage, ChatChannel};

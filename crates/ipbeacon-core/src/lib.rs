// # ipbeacon-core
//
// Core library for the ipbeacon external IP notifier.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for fetching the host's external IP address
// - **ChatChannel**: Trait for the chat platform that displays it
// - **Reconciler**: Brings a channel's pinned status message in line with an IP
// - **Poller**: Fixed-interval loop that detects changes and drives the Reconciler
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic has no network code of its own
// 2. **Single Writer**: The observed IP is owned by the Poller, no locks
// 3. **Library-First**: The daemon is a thin wrapper around this crate
// 4. **Retry by Interval**: Failed cycles are retried on the next tick only

pub mod traits;
pub mod reconciler;
pub mod poller;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{ChannelMessage, ChatChannel, IpSource};
pub use reconciler::{ReconcileReport, Reconciler, StatusOutcome};
pub use poller::{CycleOutcome, Poller, PollerEvent};
pub use config::{PollerConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_IP_CHECK_URL};
pub use error::{Error, Result};

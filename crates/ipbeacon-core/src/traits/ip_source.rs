// # IP Source Trait
//
// Defines the interface for fetching the external IP address.
//
// ## Implementations
//
// - HTTP echo service: `ipbeacon-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ipbeacon_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let ip = source.fetch().await?;
//     println!("External IP: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for external IP source implementations
///
/// # Single-shot
///
/// `fetch()` performs exactly one attempt. Sources must not retry, sleep or
/// cache: the Poller retries by calling again on its next interval, and a
/// cached answer would hide real changes.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current external IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The address as reported by the source
    /// - `Err(Error::Network)`: Transport failure or unusable response
    async fn fetch(&self) -> Result<IpAddr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

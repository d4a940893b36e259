// # IP Resolver Trait
//
// Defines the interface for detecting the caller's public IP address.
//
// ## Implementations
//
// - HTTP IP-echo services: `dns-updater-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dns_updater_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let public_ip = resolver.resolve().await?;
//     println!("Public IP: {}", public_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public IP resolvers
///
/// A resolver answers one question per call: what is the caller's public
/// address right now. The answer is only valid for the cycle that asked.
///
/// # Contract
///
/// - One outbound request per call, no caching between calls
/// - No retry: a failed call returns an error and the engine skips the cycle
/// - Transport failures, non-2xx answers, and unparseable bodies all map to
///   [`Error::Network`](crate::Error::Network)
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current public IP address
    /// - `Err(Error)`: If the address could not be determined
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;

    /// Short name for logging (e.g., the echo service host)
    fn resolver_name(&self) -> &str {
        "ip-resolver"
    }
}

// # IP Source Trait
//
// Defines the interface for resolving the caller's public IPv4 address.
//
// ## Implementations
//
// - HTTP endpoint (ipify and friends): `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> ddns_core::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let ip = source.current().await?;
//     println!("public address: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for IP source implementations
///
/// A source answers one question per run: what is the public IPv4 address
/// right now. Implementations must be thread-safe and usable across async
/// tasks.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP requests to their configured endpoint
/// - ✅ Reuse the shared `RequestClient` retry policy
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Access the state store (owned by the reconciler)
/// - ❌ Add retries on top of the `RequestClient` policy
/// - ❌ Return a value that has not been validated as IPv4
///
/// A failed resolution aborts the run; the external scheduler retries later.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: A validated address
    /// - `Err(Error::IpSource)`: The endpoint could not be reached
    /// - `Err(Error::InvalidIp)`: The endpoint answered with something else
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Human-readable description of where the address comes from (for logging)
    fn source_url(&self) -> &str;
}

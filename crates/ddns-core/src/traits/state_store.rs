// # State Store Trait
//
// Defines the interface for the state cache: the last IP this tool
// successfully applied for one (domain, record name) pair.
//
// ## Purpose
//
// The cached value lets a run skip listing entirely when the public IP has
// not moved (see `EngineConfig::use_cache`). It is a single scalar and is
// never deleted automatically.
//
// ## Implementations
//
// - File-based: `FileStateStore` (atomic replace)
// - In-memory: `MemoryStateStore` (embedding and tests)

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for state store implementations
///
/// A store is already scoped to one record when it is constructed, so the
/// methods take no record name.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform local I/O for persistent storage
/// - ✅ Recover from corrupt contents by reporting "no value"
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates or IP lookups
/// - ❌ Decide when to update (owned by the reconciler)
/// - ❌ Leave a partially written value visible to readers
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the last applied IP
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Ipv4Addr))`: The cached IP
    /// - `Ok(None)`: Nothing cached yet, or the cached value was unusable
    /// - `Err(Error)`: Storage error
    async fn get_last_ip(&self) -> Result<Option<Ipv4Addr>, crate::Error>;

    /// Replace the cached IP
    ///
    /// Readers observe either the old value or the new one, never a mix.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Successfully persisted
    /// - `Err(Error)`: Storage error
    async fn set_last_ip(&self, ip: Ipv4Addr) -> Result<(), crate::Error>;
}

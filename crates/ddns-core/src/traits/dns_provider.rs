// # DNS Provider Trait
//
// Defines the record repository interface the reconciler drives.
//
// ## Implementations
//
// - DigitalOcean: `ddns-provider-digitalocean` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, NewRecord};
//
// #[tokio::main]
// async fn main() -> ddns_core::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     // Every record in the zone, across all pages
//     let records = provider.list_records().await?;
//
//     if records.is_empty() {
//         provider
//             .create_record(&NewRecord::a("home", "203.0.113.7", 300))
//             .await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A DNS record as the provider reports it
///
/// The provider owns record identity; ids are never invented locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Provider-assigned identity
    pub id: u64,
    /// Record type ("A", "CNAME", ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Name relative to the zone ("@" for the apex)
    pub name: String,
    /// Record data; an IP literal for A records
    pub data: String,
    /// TTL in seconds
    #[serde(default)]
    pub ttl: u32,
}

impl DomainRecord {
    /// Whether this record has exactly the given type and name
    pub fn matches(&self, record_type: &str, name: &str) -> bool {
        self.record_type == record_type && self.name == name
    }
}

/// Body of a create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    pub ttl: u32,
}

impl NewRecord {
    /// An A record pointing `name` at `data`
    pub fn a(name: impl Into<String>, data: impl Into<String>, ttl: u32) -> Self {
        Self {
            record_type: "A".to_string(),
            name: name.into(),
            data: data.into(),
            ttl,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Each method is one logical API call. Implementations must be thread-safe
/// and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses into typed values
/// - ✅ Follow pagination cursors while listing
///
/// ## Forbidden Capabilities
/// - ❌ Retry beyond the shared `RequestClient` policy
/// - ❌ Filter records by name or type (the reconciler does that)
/// - ❌ Decide whether an update is needed (owned by the reconciler)
/// - ❌ Access the state store
///
/// ## Error Kinds
///
/// Each method wraps its failure in the matching stage error so the
/// process boundary can tell the stages apart:
/// `list_records` → `Error::List`, `create_record` → `Error::Create`,
/// `update_record` → `Error::Update`, `delete_record` → `Error::Delete`.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record in the zone
    ///
    /// Walks all pages until the provider stops supplying a cursor. No
    /// server-side filtering is applied.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DomainRecord>)`: All records, in provider order
    /// - `Err(Error::List)`: A page request failed or pagination did not terminate
    async fn list_records(&self) -> Result<Vec<DomainRecord>, crate::Error>;

    /// Create a record
    ///
    /// # Parameters
    ///
    /// - `record`: Type, name, data and TTL of the new record
    ///
    /// # Returns
    ///
    /// - `Ok(DomainRecord)`: The created record with its assigned id
    /// - `Err(Error::Create)`: If the call failed
    async fn create_record(&self, record: &NewRecord) -> Result<DomainRecord, crate::Error>;

    /// Point an existing record at new data
    ///
    /// # Parameters
    ///
    /// - `id`: Provider-assigned record id
    /// - `data`: New record data
    /// - `ttl`: TTL to set alongside the data
    ///
    /// # Returns
    ///
    /// - `Ok(DomainRecord)`: The record after the update
    /// - `Err(Error::Update)`: If the call failed
    async fn update_record(
        &self,
        id: u64,
        data: &str,
        ttl: u32,
    ) -> Result<DomainRecord, crate::Error>;

    /// Delete a record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The record is gone
    /// - `Err(Error::Delete)`: If the call failed
    async fn delete_record(&self, id: u64) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

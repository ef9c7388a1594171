//! Configuration types for the DDNS system
//!
//! This module defines the resolved configuration a run consumes. How the
//! values are gathered (environment, files, flags) is up to the embedding
//! binary; [`DdnsConfig::validate`] is the single gate every run passes
//! before any network call.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::RetryPolicy;

/// DigitalOcean API base URL
pub const DEFAULT_API_BASE: &str = "https://api.digitalocean.com/v2";

/// Default public IP endpoint (returns a bare IPv4 literal)
pub const DEFAULT_IP_SOURCE_URL: &str = "https://api.ipify.org";

/// Largest page size the records endpoint accepts
pub const MAX_PER_PAGE: u32 = 200;

/// Prefix shared by the state and lock file names
const FILE_PREFIX: &str = "do-ddns";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider credentials and zone
    pub provider: ProviderConfig,

    /// The record kept in sync
    pub record: RecordConfig,

    /// Where the public IP comes from
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Where the state cache and run lock live
    #[serde(default)]
    pub state: StateConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration with default tunables
    pub fn new(
        api_token: impl Into<String>,
        domain: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderConfig::new(api_token, domain),
            record: RecordConfig::new(record_name),
            ip_source: IpSourceConfig::default(),
            state: StateConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Token, domain and record name must be non-empty; every tunable must
    /// be inside the range the provider accepts.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.record.validate()?;
        self.ip_source.validate()?;
        self.state.validate()?;
        self.engine.validate()?;
        Ok(())
    }

    /// Path of the state cache file for this domain and record
    pub fn state_file(&self) -> PathBuf {
        self.state.dir.join(format!("{}.last_ip", self.file_stem()))
    }

    /// Path of the run lock file for this domain and record
    pub fn lock_file(&self) -> PathBuf {
        self.state.dir.join(format!("{}.lock", self.file_stem()))
    }

    /// Fully qualified name of the managed record
    pub fn fqdn(&self) -> String {
        if self.record.name == "@" {
            self.provider.domain.clone()
        } else {
            format!("{}.{}", self.record.name, self.provider.domain)
        }
    }

    fn file_stem(&self) -> String {
        let sanitize = |s: &str| s.replace(['/', '\\'], "_");
        format!(
            "{}-{}-{}",
            FILE_PREFIX,
            sanitize(&self.provider.domain),
            sanitize(&self.record.name)
        )
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Personal access token with DNS read/write scope
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// The zone (e.g. "example.com")
    pub domain: String,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a provider configuration against the public API
    pub fn new(api_token: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            domain: domain.into(),
            api_base: default_api_base(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.trim().is_empty() {
            return Err(crate::Error::config("API token is required"));
        }
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Domain is required"));
        }
        validate_domain_name(&self.domain)?;
        validate_http_url("API base URL", &self.api_base)?;
        Ok(())
    }
}

/// DNS record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Record name relative to the zone ("home", or "@" for the apex)
    pub name: String,

    /// Record type; only "A" is supported
    #[serde(default = "default_record_type")]
    pub record_type: String,

    /// Desired TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: default_record_type(),
            ttl: default_ttl(),
        }
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Record name is required"));
        }
        if self.name != "@" {
            validate_domain_name(&self.name)?;
        }
        if !self.record_type.eq_ignore_ascii_case("A") {
            return Err(crate::Error::config(format!(
                "Record type '{}' is not supported. Supported types: A",
                self.record_type
            )));
        }
        if !(30..=86400).contains(&self.ttl) {
            return Err(crate::Error::config(format!(
                "TTL must be between 30 and 86400 seconds. Got: {}",
                self.ttl
            )));
        }
        Ok(())
    }
}

/// IP source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// Endpoint returning the caller's public IPv4 address as its whole body
    #[serde(default = "default_ip_source_url")]
    pub url: String,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("IP source URL", &self.url)
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_source_url(),
        }
    }
}

/// State cache and run lock location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding the state and lock files
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl StateConfig {
    /// Validate the state configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.dir.as_os_str().is_empty() {
            return Err(crate::Error::config("State directory cannot be empty"));
        }
        Ok(())
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attempts per HTTP request, including the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Records requested per listing page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Upper bound on pages fetched in one listing
    ///
    /// Guards against a provider cursor that never ends.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Delete matching records other than the canonical one
    #[serde(default)]
    pub cleanup_duplicates: bool,

    /// Skip listing entirely when the cached IP equals the resolved IP
    ///
    /// Only safe when nothing else edits the record.
    #[serde(default)]
    pub use_cache: bool,

    /// Log intended changes without making them
    #[serde(default)]
    pub dry_run: bool,

    /// Deadline for the whole run (in seconds)
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Timeout for a single HTTP exchange (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=10).contains(&self.max_retries) {
            return Err(crate::Error::config(format!(
                "Max retries must be between 1 and 10. Got: {}",
                self.max_retries
            )));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(crate::Error::config(format!(
                "Page size must be between 1 and {}. Got: {}",
                MAX_PER_PAGE, self.per_page
            )));
        }
        if self.max_pages == 0 {
            return Err(crate::Error::config("Max pages must be > 0"));
        }
        if self.run_timeout_secs == 0 {
            return Err(crate::Error::config("Run timeout must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        Ok(())
    }

    /// Retry policy for every HTTP request of a run
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries)
    }

    /// Deadline for the whole run
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Timeout for a single HTTP exchange
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            cleanup_duplicates: false,
            use_cache: false,
            dry_run: false,
            run_timeout_secs: default_run_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Basic RFC 1035 label validation for zone and record names
fn validate_domain_name(name: &str) -> Result<(), crate::Error> {
    if name.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            name.len(),
            name
        )));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                name
            )));
        }
        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }
        // Underscores show up in service labels such as "_acme-challenge"
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*')
        {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn validate_http_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_ip_source_url() -> String {
    DEFAULT_IP_SOURCE_URL.to_string()
}

fn default_state_dir() -> PathBuf {
    Path::new("/var/tmp").to_path_buf()
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_ttl() -> u32 {
    300
}

fn default_max_retries() -> u32 {
    5
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

fn default_max_pages() -> u32 {
    100
}

fn default_run_timeout_secs() -> u64 {
    60
}

fn default_http_timeout_secs() -> u64 {
    30
}

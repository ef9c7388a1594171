// # DigitalOcean DNS Provider
//
// This crate provides the record repository for the DDNS updater, backed
// by the DigitalOcean v2 REST API.
//
// ## Implementation Status
//
// - ✅ Lists every record in the zone, following pagination cursors
// - ✅ One request per create, update and delete
// - ✅ Typed request and response payloads (serde)
// - ✅ Bounded pagination: page limit, repeated-cursor and foreign-cursor guards
// - ✅ Provider error messages surfaced verbatim on non-retryable failures
// - ❌ NO retry logic of its own (the shared `RequestClient` owns retries and backoff)
// - ❌ NO name/type filtering (owned by the reconciler)
// - ❌ NO caching (state owned by StateStore)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Pagination cursors are only followed inside the configured API base, so
//   the bearer token is never sent to another host
//
// ## API Reference
//
// - List records: GET `/domains/:domain/records?per_page=N&page=P`
//   → `{ "domain_records": [...], "links": { "pages": { "next": "..." } } }`
// - Create record: POST `/domains/:domain/records` body `{type, name, data, ttl}`
// - Update record: PUT `/domains/:domain/records/:id` body `{data, ttl}`
// - Delete record: DELETE `/domains/:domain/records/:id` (204, no body)
// - Errors: `{ "id": "...", "message": "..." }`

use async_trait::async_trait;
use ddns_core::DdnsConfig;
use ddns_core::client::{Method, RequestClient, Url};
use ddns_core::traits::{DnsProvider, DomainRecord, NewRecord};
use ddns_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;

/// Default page size (the API maximum)
const DEFAULT_PER_PAGE: u32 = 200;

/// Default upper bound on pages fetched by one listing
const DEFAULT_MAX_PAGES: u32 = 100;

/// One page of the record listing
#[derive(Debug, Deserialize)]
struct DomainRecordsResponse {
    domain_records: Vec<DomainRecord>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

/// Single-record envelope returned by create and update
#[derive(Debug, Deserialize)]
struct DomainRecordResponse {
    domain_record: DomainRecord,
}

impl DomainRecordsResponse {
    /// The non-blank `next` cursor, if any
    fn next_page(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.pages.as_ref())
            .and_then(|p| p.next.as_deref())
            .map(str::trim)
            .filter(|next| !next.is_empty())
    }
}

/// DigitalOcean DNS provider
///
/// # Trust Level: Untrusted
///
/// Isolated and stateless. Every method is a single logical request through
/// the shared `RequestClient`, except listing, which issues one request per
/// page.
pub struct DigitalOceanProvider {
    /// Zone the records live in
    domain: String,

    /// API base URL without a trailing slash
    api_base: String,

    /// Bearer-authenticated request client
    client: RequestClient,

    /// Records requested per page
    per_page: u32,

    /// Upper bound on pages per listing
    max_pages: u32,
}

// Custom Debug implementation; the client itself redacts the token
impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("domain", &self.domain)
            .field("api_base", &self.api_base)
            .field("client", &self.client)
            .field("per_page", &self.per_page)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

impl DigitalOceanProvider {
    /// Create a provider for `domain`
    ///
    /// # Parameters
    ///
    /// - `domain`: The zone (e.g., "example.com")
    /// - `client`: Request client already carrying the bearer token
    pub fn new(domain: impl Into<String>, client: RequestClient) -> Self {
        Self {
            domain: domain.into(),
            api_base: ddns_core::config::DEFAULT_API_BASE.to_string(),
            client,
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Build a provider from the run configuration
    ///
    /// The token is moved into the request client and never stored elsewhere.
    pub fn from_config(config: &DdnsConfig) -> Result<Self> {
        let client = RequestClient::new(
            config.engine.retry_policy(),
            config.engine.http_timeout(),
        )
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?
        .with_bearer_token(config.provider.api_token.clone());

        Ok(Self::new(config.provider.domain.clone(), client)
            .with_base_url(config.provider.api_base.clone())
            .with_page_limits(config.engine.per_page, config.engine.max_pages))
    }

    /// Point the provider at another API base (tests, proxies)
    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the page size and page bound used by listings
    pub fn with_page_limits(mut self, per_page: u32, max_pages: u32) -> Self {
        self.per_page = per_page;
        self.max_pages = max_pages;
        self
    }

    fn records_url(&self) -> String {
        format!("{}/domains/{}/records", self.api_base, self.domain)
    }

    fn record_url(&self, id: u64) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    /// Whether `next` points inside the API base
    ///
    /// Scheme, host and port must match exactly, the path must sit under the
    /// base path on a segment boundary and no userinfo is allowed.
    fn within_api_base(&self, next: &str) -> bool {
        let (Ok(base), Ok(next)) = (Url::parse(&self.api_base), Url::parse(next)) else {
            return false;
        };

        if !next.username().is_empty() || next.password().is_some() {
            return false;
        }
        if next.scheme() != base.scheme()
            || next.host_str() != base.host_str()
            || next.port_or_known_default() != base.port_or_known_default()
        {
            return false;
        }

        let base_path = base.path().trim_end_matches('/');
        let path = next.path();
        path == base_path || path.starts_with(&format!("{}/", base_path))
    }

    /// Check a `next` cursor before following it
    fn check_cursor(&self, next: &str, seen: &HashSet<String>) -> Result<()> {
        if !self.within_api_base(next) {
            return Err(Error::pagination(format!(
                "next page cursor {} is outside the API base {}",
                next, self.api_base
            )));
        }
        if seen.contains(next) {
            return Err(Error::pagination(format!(
                "next page cursor {} was already fetched",
                next
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    async fn list_records(&self) -> Result<Vec<DomainRecord>> {
        let mut url = format!("{}?per_page={}&page=1", self.records_url(), self.per_page);
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut page_count = 0u32;

        loop {
            page_count += 1;
            if page_count > self.max_pages {
                return Err(Error::pagination(format!(
                    "more than {} pages for domain {}",
                    self.max_pages, self.domain
                )));
            }

            let page: DomainRecordsResponse = self
                .client
                .request_json(Method::GET, &url, None)
                .await
                .map_err(Error::List)?;

            tracing::debug!(
                domain = %self.domain,
                page = page_count,
                items_in_page = page.domain_records.len(),
                "Fetched record page"
            );

            let next = page.next_page().map(str::to_string);
            records.extend(page.domain_records);

            let Some(next) = next else {
                break;
            };
            seen.insert(url);
            self.check_cursor(&next, &seen)?;
            url = next;
        }

        tracing::debug!(
            domain = %self.domain,
            total_pages = page_count,
            total_records = records.len(),
            "Listed all records"
        );
        Ok(records)
    }

    async fn create_record(&self, record: &NewRecord) -> Result<DomainRecord> {
        let body = serde_json::to_value(record)?;

        let response: DomainRecordResponse = self
            .client
            .request_json(Method::POST, &self.records_url(), Some(&body))
            .await
            .map_err(Error::Create)?;

        Ok(response.domain_record)
    }

    async fn update_record(&self, id: u64, data: &str, ttl: u32) -> Result<DomainRecord> {
        let body = serde_json::json!({ "data": data, "ttl": ttl });

        let response: DomainRecordResponse = self
            .client
            .request_json(Method::PUT, &self.record_url(id), Some(&body))
            .await
            .map_err(|source| Error::Update { id, source })?;

        Ok(response.domain_record)
    }

    async fn delete_record(&self, id: u64) -> Result<()> {
        self.client
            .request(Method::DELETE, &self.record_url(id), None)
            .await
            .map_err(|source| Error::Delete { id, source })?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "digitalocean"
    }
}

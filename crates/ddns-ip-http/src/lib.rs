// # HTTP IP Source
//
// This crate resolves the caller's public IPv4 address from a "what is my
// IP" endpoint.
//
// ## Contract
//
// - One GET per run through the shared `RequestClient`, so transient
//   failures get the same retry and backoff policy as provider calls
// - No additional retries at this layer: a failed lookup aborts the run
// - The body must be a bare dotted-quad IPv4 literal (surrounding
//   whitespace allowed). Error pages, IPv6 and empty bodies are rejected.
//
// ## Compatible Endpoints
//
// Any endpoint that returns the address as its entire plain-text body:
// - https://api.ipify.org (default)
// - https://ifconfig.me/ip
// - https://ipv4.icanhazip.com

use ddns_core::client::{Method, RequestClient};
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};

use std::net::Ipv4Addr;

/// Longest body considered; a bare IPv4 literal is at most 15 bytes
pub const MAX_BODY_LEN: usize = 1024;

/// HTTP-based public IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// Endpoint returning the address
    url: String,

    /// Shared request client (no bearer token: the endpoint is public)
    client: RequestClient,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint to fetch the address from (e.g., "https://api.ipify.org")
    /// - `client`: Request client carrying the run's retry policy
    pub fn new(url: impl Into<String>, client: RequestClient) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Fetch and validate the current address
    async fn fetch_ip(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .request(Method::GET, &self.url, None)
            .await
            .map_err(Error::IpSource)?;

        let ip = parse_ipv4_body(&response.body).ok_or_else(|| Error::InvalidIp {
            url: self.url.clone(),
            value: preview(&response.body),
        })?;

        tracing::debug!(url = %self.url, %ip, "Fetched public IP");
        Ok(ip)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.fetch_ip().await
    }

    fn source_url(&self) -> &str {
        &self.url
    }
}

/// Parse a response body consisting of exactly one IPv4 literal
///
/// `Ipv4Addr::from_str` accepts only the four-part dotted-decimal form, so
/// shorthand like "127.1" or octal-looking parts are rejected as well.
pub fn parse_ipv4_body(body: &str) -> Option<Ipv4Addr> {
    if body.len() > MAX_BODY_LEN {
        return None;
    }
    body.trim().parse::<Ipv4Addr>().ok()
}

/// Trimmed, bounded copy of the body for error messages
fn preview(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(64) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// # Resilient Request Client
//
// Issues one logical HTTP request and owns the whole retry policy for it.
// The client knows nothing about DNS: the IP source and the DNS provider
// both go through it, so retry behavior is identical for every call a run
// makes.
//
// ## Policy
//
// | Response                      | Handling                                         |
// |-------------------------------|--------------------------------------------------|
// | 2xx                           | return body                                      |
// | 429                           | wait `Retry-After` (whole seconds) or backoff    |
// | 5xx, connect/timeout failures | wait backoff                                     |
// | any other status              | fail immediately with the provider's message     |
//
// Backoff starts at 1s and doubles up to 64s. After `max_attempts`
// transient failures the request fails with `RetriesExceeded`, which
// wraps the last transient cause.

mod backoff;

pub use backoff::{Backoff, INITIAL_BACKOFF, MAX_BACKOFF, parse_retry_after};
pub use reqwest::{Method, Url};

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Default per-request HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest server error body kept in an error message
const MAX_ERROR_BODY_LEN: usize = 512;

/// Failure of a single logical request
#[derive(Error, Debug)]
pub enum RequestError {
    /// HTTP 429 (transient)
    #[error("Rate limited (HTTP 429), retry after {retry_after:?}")]
    Throttled {
        /// Wait requested by the server, if it sent a usable `Retry-After`
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx (transient)
    #[error("Server error (HTTP {status}): {body}")]
    Server {
        /// Status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Connect, timeout or body read failure (transient)
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Any other non-2xx status (not retried)
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Status {
        /// Status code
        status: u16,
        /// `message` field of the provider's error body, verbatim
        message: Option<String>,
    },

    /// The response body did not match the expected schema (not retried)
    #[error("Failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request could not be built (not retried)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every attempt failed transiently
    #[error("Exceeded retries after {attempts} attempts: {last}")]
    RetriesExceeded {
        /// Number of attempts made
        attempts: u32,
        /// The last transient failure
        #[source]
        last: Box<RequestError>,
    },
}

impl RequestError {
    /// Whether the retry loop may try again after this failure
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. } | Self::Server { .. } | Self::Transport(_)
        )
    }

    /// HTTP status associated with the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Throttled { .. } => Some(429),
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::RetriesExceeded { last, .. } => last.status(),
            Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }
}

/// Retry limits for one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// First computed wait
    pub initial_backoff: Duration,
    /// Cap for computed waits
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Default backoff bounds with the given attempt limit
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Raw body
    pub body: String,
}

/// Error body returned by the provider on failures
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[allow(dead_code)]
    #[serde(default)]
    id: Option<String>,
    message: String,
}

/// HTTP client with retry, backoff and rate-limit handling
#[derive(Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    /// ⚠️ NEVER log this value
    bearer_token: Option<String>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("policy", &self.policy)
            .finish()
    }
}

impl RequestClient {
    /// Create a client with the given retry policy and per-request timeout
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RequestError::InvalidRequest(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            bearer_token: None,
            policy,
        })
    }

    /// Authenticate every request with `Authorization: Bearer <token>`
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Issue one logical request and return the 2xx response.
    ///
    /// # Errors
    ///
    /// - `Status` for non-retryable statuses, with the provider's message
    /// - `RetriesExceeded` once `max_attempts` transient failures occurred
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, RequestError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = Backoff::new(self.policy.initial_backoff, self.policy.max_backoff);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.send_once(&method, url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            let computed = backoff.next_delay();

            if attempt >= max_attempts {
                warn!(%method, url, attempt, error = %err, "Giving up after transient failure");
                return Err(RequestError::RetriesExceeded {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let wait = wait_before_retry(&err, computed);
            warn!(
                %method,
                url,
                attempt,
                wait_secs = wait.as_secs_f64(),
                error = %err,
                "Transient failure, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Issue one logical request and decode the 2xx body as JSON
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, RequestError> {
        let response = self.request(method, url, body).await?;
        serde_json::from_str(&response.body).map_err(RequestError::Decode)
    }

    /// Perform exactly one HTTP exchange and classify the outcome
    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, RequestError> {
        debug!(%method, url, "HTTP request");

        let mut builder = self.http.request(method.clone(), url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                RequestError::InvalidRequest(e.to_string())
            } else {
                RequestError::Transport(e)
            }
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let text = response.text().await.map_err(RequestError::Transport)?;
        debug!(%method, url, status = status.as_u16(), "HTTP response");

        classify(status, retry_after, text)
    }
}

/// Map a status code and body to success or a typed failure
fn classify(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> Result<Response, RequestError> {
    if status.is_success() {
        return Ok(Response {
            status: status.as_u16(),
            body,
        });
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(RequestError::Throttled { retry_after });
    }

    if status.is_server_error() {
        return Err(RequestError::Server {
            status: status.as_u16(),
            body: truncate(body),
        });
    }

    Err(RequestError::Status {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

/// Server hint for throttled responses, the computed backoff otherwise
fn wait_before_retry(err: &RequestError, computed: Duration) -> Duration {
    match err {
        RequestError::Throttled {
            retry_after: Some(wait),
        } => *wait,
        _ => computed,
    }
}

/// Extract `message` from a `{id, message}` error body
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|e| e.message)
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut end = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push('…');
    }
    body
}

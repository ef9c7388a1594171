//! Error types for the DDNS system
//!
//! This module defines the run-level error taxonomy. Each reconciliation
//! stage wraps its failure in its own variant so the process boundary can
//! map the failed stage to a distinct exit code.

use std::time::Duration;

use thiserror::Error;

use crate::client::RequestError;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (detected before any network call)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The public IP endpoint could not be reached
    #[error("IP source error: {0}")]
    IpSource(#[source] RequestError),

    /// The public IP endpoint answered with something that is not an IPv4 address
    #[error("Invalid address from {url}: {value:?}")]
    InvalidIp {
        /// Endpoint that produced the value
        url: String,
        /// Trimmed response body
        value: String,
    },

    /// Listing the zone's records failed
    #[error("Failed to list records: {0}")]
    List(#[source] RequestError),

    /// Listing did not terminate (page bound exceeded, cursor loop, foreign cursor)
    #[error("Record listing aborted: {0}")]
    Pagination(String),

    /// Creating the target record failed
    #[error("Failed to create record: {0}")]
    Create(#[source] RequestError),

    /// Updating the canonical record failed
    #[error("Failed to update record {id}: {source}")]
    Update {
        /// Provider-assigned record id
        id: u64,
        /// Underlying request failure
        #[source]
        source: RequestError,
    },

    /// Deleting a duplicate record failed
    #[error("Failed to delete record {id}: {source}")]
    Delete {
        /// Provider-assigned record id
        id: u64,
        /// Underlying request failure
        #[source]
        source: RequestError,
    },

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Run lock errors other than contention
    #[error("Run lock error: {0}")]
    Lock(String),

    /// The overall run deadline expired
    #[error("Run exceeded deadline of {0:?}")]
    Timeout(Duration),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a pagination error
    pub fn pagination(msg: impl Into<String>) -> Self {
        Self::Pagination(msg.into())
    }

    /// Create a run lock error
    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }

    /// The request failure behind this error, if the error came from the API
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Self::IpSource(e) | Self::List(e) | Self::Create(e) => Some(e),
            Self::Update { source, .. } | Self::Delete { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_error_names_record() {
        let err = Error::Update {
            id: 42,
            source: RequestError::Status {
                status: 422,
                message: Some("Data needs to be a valid IP".to_string()),
            },
        };

        let text = err.to_string();
        assert!(text.contains("42"));
        assert!(text.contains("Data needs to be a valid IP"));
        assert!(err.request_error().is_some());
    }

    #[test]
    fn local_errors_carry_no_request_cause() {
        assert!(Error::config("missing token").request_error().is_none());
        assert!(Error::Timeout(Duration::from_secs(60)).request_error().is_none());
    }
}

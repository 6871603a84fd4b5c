//! Error types for the order API client.
//!
//! # Design
//! Every operation in the core returns `ApiResult<T>`: either the typed
//! payload or an `ApiError` carrying a message fit for display. The variants
//! keep enough structure (status code, failure class) for callers that want
//! to branch, while `Display` always yields the human-readable message alone.

use thiserror::Error;

/// Message used when neither the server nor the transport supplied one.
pub const GENERIC_ERROR_MESSAGE: &str = "an unexpected error occurred";

/// Outcome of every transport call and resource operation.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures surfaced by the transport and resource operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, timeout,
    /// or the body could not be read.
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build a `Network` error, substituting the generic message for an
    /// empty description.
    pub fn network(description: impl Into<String>) -> Self {
        let description = description.into();
        if description.trim().is_empty() {
            ApiError::Network(GENERIC_ERROR_MESSAGE.to_string())
        } else {
            ApiError::Network(description)
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status for server-reported failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Rejections from `NewOrder::validate`, mirroring the create form's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("customer name is required")]
    MissingCustomerName,

    #[error("product name is required")]
    MissingProductName,

    #[error("quantity must be a positive integer")]
    NonPositiveQuantity,
}

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("invalid timeout {0:?}: expected a positive number of milliseconds")]
    InvalidTimeout(String),
}

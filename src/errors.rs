/*!
 * Error types for the bulkxlate application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether another attempt at the same request can succeed.
    ///
    /// Everything is retryable except credential problems and client errors
    /// that will be rejected again unchanged (408 and 429 stay retryable).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => false,
            Self::ApiError { status_code, .. } => {
                !(400..500).contains(status_code) || *status_code == 408 || *status_code == 429
            }
            _ => true,
        }
    }

    /// Map an HTTP error status and body to the matching variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Map a transport-level reqwest failure to the matching variant
    pub fn from_reqwest(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout_secs)
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Configuration problems detected before any remote call is made
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Input file does not exist: {0:?}")]
    MissingInput(PathBuf),

    #[error("Failed to read input file {path:?}: {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No input files configured")]
    NoInputs,

    #[error("Boundary marker must not be empty")]
    EmptyBoundary,

    #[error("At least one output language is required")]
    NoTargetLanguages,

    #[error("Expected {inputs} output paths to match the input paths, got {outputs}")]
    OutputPathMismatch { inputs: usize, outputs: usize },

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("Concurrent pairs must be at least 1")]
    ZeroConcurrency,

    #[error("Translation API key is required for {0} provider")]
    MissingApiKey(String),

    #[error("Invalid language: {0}")]
    InvalidLanguage(String),

    #[error("Invalid provider endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Input file is listed more than once: {0:?}")]
    DuplicateInput(PathBuf),

    #[error("Translations {first} and {second} would both be written to {path:?}")]
    ArtifactCollision {
        path: PathBuf,
        first: String,
        second: String,
    },
}

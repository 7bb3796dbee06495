//! Error types for report building and API calls.
//!
//! A single [`Error`] enum covers both the synchronous argument checks made by
//! the report builder and the failures the HTTP transport can hit. Transport
//! variants keep the raw response body and status so a failed call can be
//! inspected without re-running it.

use http::{HeaderMap, StatusCode};

/// The main error type of this crate.
///
/// # Examples
///
/// ```
/// use cja_client::{Error, ReportRequestBuilder};
///
/// let mut builder = ReportRequestBuilder::new();
/// match builder.add_metric("") {
///     Err(Error::InvalidArgument(msg)) => assert!(msg.contains("metric")),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required argument was empty, or an index did not address an
    /// existing element.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A seeded report document did not have the expected shape.
    #[error("Invalid report document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// Reading a configuration or request template file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A network-level error occurred (connection refused, DNS failure, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be decoded into the expected type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The API answered with a non-2xx status.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
        /// Rate limit information parsed from headers
        rate_limit_info: Option<crate::rate_limit::RateLimitInfo>,
    },

    /// Connection settings or client options are unusable.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// All retry attempts were used up.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// The number of attempts made
        attempts: usize,
        /// The last error encountered
        last_error: Box<Error>,
    },

    /// The request body could not be encoded as JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`] naming a missing value.
    pub(crate) fn required(what: &str) -> Self {
        Error::InvalidArgument(format!("a {} is required", what))
    }

    /// Returns `true` if a new attempt of the same call might succeed.
    ///
    /// Network errors, timeouts, 5xx and 429 responses are retryable.
    /// Argument, document and decode errors are not.
    ///
    /// ```
    /// use cja_client::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::TOO_MANY_REQUESTS,
    ///     raw_response: "slow down".to_string(),
    ///     headers: http::HeaderMap::new(),
    ///     rate_limit_info: None,
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!Error::InvalidArgument("x".into()).is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout => true,
            Error::HttpError { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Error::InvalidArgument(_)
            | Error::InvalidDocument(_)
            | Error::Io(_)
            | Error::DeserializationFailed { .. }
            | Error::ConfigurationError(_)
            | Error::MaxRetriesExceeded { .. }
            | Error::SerializationFailed(_)
            | Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the parsed rate limit headers of a throttled response.
    pub fn rate_limit_info(&self) -> Option<&crate::rate_limit::RateLimitInfo> {
        match self {
            Error::HttpError {
                rate_limit_info, ..
            } => rate_limit_info.as_ref(),
            _ => None,
        }
    }

    /// Delay suggested by the server's rate limit headers, capped at `max_wait`.
    pub fn rate_limit_delay(&self, max_wait: std::time::Duration) -> Option<std::time::Duration> {
        self.rate_limit_info()?.delay(max_wait)
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

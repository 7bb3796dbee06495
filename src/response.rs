//! Decoded API responses with their transport details.

use crate::rate_limit::RateLimitInfo;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// Header the API gateway uses to identify a request in support tickets.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// A successful call: the decoded body plus how it was obtained.
///
/// Derefs to the body, so `response["content"]` works on a
/// `Response<serde_json::Value>`.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: T,

    /// The body exactly as received; empty for bodiless answers.
    pub raw_body: String,

    pub status: StatusCode,

    pub headers: HeaderMap,

    /// Time from the first attempt until this response arrived.
    pub latency: Duration,

    /// Attempts made, `1` when no retry was needed.
    pub attempts: usize,
}

impl<T> Response<T> {
    pub(crate) fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// A response header as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The gateway's id for this request, when it sent one.
    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }

    /// Quota headers of a successful call, e.g. how many requests remain.
    pub fn rate_limit(&self) -> RateLimitInfo {
        RateLimitInfo::from_headers(&self.headers)
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

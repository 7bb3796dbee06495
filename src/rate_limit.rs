//! Throttling headers and how the client reacts to them.
//!
//! When the API rejects a call with 429 it usually says how long to back
//! off. The client prefers that hint over its own retry schedule.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Throttling hints parsed from response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// From `X-RateLimit-Reset` / `RateLimit-Reset` (Unix seconds).
    pub reset_at: Option<SystemTime>,

    /// From `Retry-After`, given in seconds or as an HTTP date.
    pub retry_after: Option<Duration>,

    /// From `X-RateLimit-Remaining`.
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// ```
    /// use cja_client::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "12".parse().unwrap());
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert!(info.is_rate_limited());
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: ["x-ratelimit-reset", "ratelimit-reset"]
                .into_iter()
                .find_map(|name| parse_unix_timestamp(headers, name)),
            retry_after: parse_retry_after(headers),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// Suggested wait, capped at `max_wait`. `Retry-After` wins over the
    /// reset timestamp; a reset time already in the past gives `None`.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        if let Some(retry_after) = self.retry_after {
            return Some(retry_after.min(max_wait));
        }
        let until_reset = self.reset_at?.duration_since(SystemTime::now()).ok()?;
        Some(until_reset.min(max_wait))
    }

    /// A `Retry-After` hint or zero remaining quota.
    pub fn is_rate_limited(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }

    fn without_retry_after(mut self) -> Self {
        self.retry_after = None;
        self
    }
}

/// How the client treats throttling hints.
///
/// ```
/// use cja_client::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::builder()
///     .max_wait(Duration::from_secs(120))
///     .build();
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Parse throttling headers and wait as told before retrying.
    pub enabled: bool,

    /// Longest wait the client accepts from a hint. Defaults to 5 minutes.
    pub max_wait: Duration,

    /// Whether `Retry-After` is used; otherwise only the reset timestamp is.
    pub respect_retry_after: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_wait: Duration::from_secs(300),
            respect_retry_after: true,
        }
    }
}

impl RateLimitConfig {
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Parses `headers` under this configuration. `None` when disabled or
    /// when the response carries no throttling hint.
    pub fn inspect(&self, headers: &HeaderMap) -> Option<RateLimitInfo> {
        if !self.enabled {
            return None;
        }
        let info = RateLimitInfo::from_headers(headers);
        let info = if self.respect_retry_after {
            info
        } else {
            info.without_retry_after()
        };
        info.is_rate_limited().then_some(info)
    }
}

#[derive(Default)]
pub struct RateLimitConfigBuilder {
    enabled: Option<bool>,
    max_wait: Option<Duration>,
    respect_retry_after: Option<bool>,
}

impl RateLimitConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = Some(respect);
        self
    }

    pub fn build(self) -> RateLimitConfig {
        let default = RateLimitConfig::default();
        RateLimitConfig {
            enabled: self.enabled.unwrap_or(default.enabled),
            max_wait: self.max_wait.unwrap_or(default.max_wait),
            respect_retry_after: self
                .respect_retry_after
                .unwrap_or(default.respect_retry_after),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = header_str(headers, "retry-after")?;
    if let Ok(seconds) = raw.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    httpdate::parse_http_date(raw)
        .ok()?
        .duration_since(SystemTime::now())
        .ok()
}

fn parse_unix_timestamp(headers: &HeaderMap, name: &str) -> Option<SystemTime> {
    let seconds = header_str(headers, name)?.trim().parse::<u64>().ok()?;
    Some(UNIX_EPOCH + Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_retry_after_seconds_capped() {
        let info = RateLimitInfo::from_headers(&headers(&[("retry-after", "600")]));
        assert_eq!(info.retry_after, Some(Duration::from_secs(600)));
        assert_eq!(
            info.delay(Duration::from_secs(60)),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_reset_timestamp_used_without_retry_after() {
        let in_a_minute = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 60;
        let reset = in_a_minute.to_string();
        let info = RateLimitInfo::from_headers(&headers(&[
            ("ratelimit-reset", reset.as_str()),
            ("x-ratelimit-remaining", "0"),
        ]));
        assert!(info.is_rate_limited());
        let delay = info.delay(Duration::from_secs(300)).unwrap();
        assert!(delay > Duration::from_secs(55) && delay <= Duration::from_secs(60));
    }

    #[test]
    fn test_past_reset_gives_no_delay() {
        let info = RateLimitInfo::from_headers(&headers(&[("x-ratelimit-reset", "1")]));
        assert_eq!(info.delay(Duration::from_secs(300)), None);
        assert!(!info.is_rate_limited());
    }

    #[test]
    fn test_inspect_respects_config() {
        let throttled = headers(&[("retry-after", "5")]);
        assert!(RateLimitConfig::default().inspect(&throttled).is_some());
        assert!(RateLimitConfig::disabled().inspect(&throttled).is_none());
        let ignore_retry_after = RateLimitConfig::builder()
            .respect_retry_after(false)
            .build();
        assert!(ignore_retry_after.inspect(&throttled).is_none());
    }
}

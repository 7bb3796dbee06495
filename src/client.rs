//! JSON-over-HTTP transport with retries and rate limit handling.
//!
//! [`Client`] sends one logical call, retrying it according to its
//! [`RetryStrategy`] and [`RetryPredicate`], and decodes the body into the
//! caller's type. It knows nothing about the reporting API itself; the
//! endpoint methods live on [`crate::Cja`].

use crate::{
    config::CjaConfig,
    metadata::RequestMetadata,
    rate_limit::RateLimitConfig,
    retry::{RetryOnRetryable, RetryPredicate, RetryStrategy},
    Error, Response, Result,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// A reusable API client. Cloning is cheap and shares the connection pool.
///
/// # Examples
///
/// ```no_run
/// use cja_client::{Client, CjaConfig, RetryStrategy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), cja_client::Error> {
/// let config = CjaConfig::from_env()?;
/// let client = Client::builder()
///     .config(&config)?
///     .timeout(Duration::from_secs(60))
///     .retry_strategy(RetryStrategy::standard())
///     .build()?;
///
/// let user: cja_client::Response<serde_json::Value> =
///     client.get("/aresconfig/users/me").await?;
/// println!("{}", user.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    retry_strategy: RetryStrategy,
    retry_predicate: Box<dyn RetryPredicate>,
    timeout: Option<Duration>,
    rate_limit_config: RateLimitConfig,
}

impl Client {
    /// Starts a [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The endpoint every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Sends a call, retrying as configured, and decodes the response body.
    ///
    /// An empty success body (as returned by some deletes) decodes as JSON
    /// `null`.
    pub async fn call<Req, Res>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match self.execute_request(&metadata, body, attempt).await {
                Ok(response) => {
                    self.parse_response(response, start_time.elapsed(), attempt)
                        .await
                }
                Err(e) => Err(e),
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %metadata.method,
                path = %metadata.path,
                "Request failed"
            );

            if !self.inner.retry_predicate.should_retry(&error, attempt) {
                return Err(error);
            }

            let rate_limit_delay = error.rate_limit_delay(self.inner.rate_limit_config.max_wait);
            let delay = match rate_limit_delay {
                Some(delay) => {
                    tracing::info!(
                        rate_limit_delay_ms = delay.as_millis() as u64,
                        attempt = attempt,
                        "Rate limited - waiting before retry"
                    );
                    Some(delay)
                }
                None => self.inner.retry_strategy.delay_for_attempt(attempt),
            };

            // A rate limit hint only shortens the wait, never extends the budget.
            let budget_left = rate_limit_delay.is_none()
                || self
                    .inner
                    .retry_strategy
                    .delay_for_attempt(attempt)
                    .is_some();

            match delay {
                Some(delay) if budget_left => {
                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = attempt,
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => {
                    return Err(Error::MaxRetriesExceeded {
                        attempts: attempt,
                        last_error: Box::new(error),
                    });
                }
            }
        }
    }

    /// Resolves `path` below the base URL's own path.
    fn resolve(&self, metadata: &RequestMetadata) -> Url {
        let mut url = self.inner.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            metadata.path.trim_start_matches('/')
        );
        url.set_path(&joined);

        if !metadata.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &metadata.query_params {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    async fn execute_request<Req>(
        &self,
        metadata: &RequestMetadata,
        body: Option<&Req>,
        attempt: usize,
    ) -> Result<reqwest::Response>
    where
        Req: Serialize,
    {
        let url = self.resolve(metadata);

        tracing::debug!(
            method = %metadata.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(metadata.method.clone(), url)
            .headers(self.inner.default_headers.clone());

        for (name, value) in &metadata.headers {
            request = request.header(name, value);
        }

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = body {
            let json =
                serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
            request = request.json(&json);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e)
            }
        })
    }

    async fn parse_response<Res>(
        &self,
        response: reqwest::Response,
        latency: Duration,
        attempts: usize,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let status = response.status();
        let headers = response.headers().clone();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            attempts = attempts,
            "Received HTTP response"
        );

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();
            let rate_limit_info = self.inner.rate_limit_config.inspect(&headers);

            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
            } else if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            }

            return Err(Error::HttpError {
                status,
                raw_response,
                headers,
                rate_limit_info,
            });
        }

        let raw_body = response.text().await?;
        let to_decode = if raw_body.trim().is_empty() {
            "null"
        } else {
            raw_body.as_str()
        };

        match serde_json::from_str::<Res>(to_decode) {
            Ok(data) => Ok(Response::new(
                data, raw_body, status, headers, latency, attempts,
            )),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );
                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call::<(), Res>(RequestMetadata::new(Method::GET, path), None)
            .await
    }

    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::POST, path), Some(body))
            .await
    }

    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::PUT, path), Some(body))
            .await
    }

    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call::<(), Res>(RequestMetadata::new(Method::DELETE, path), None)
            .await
    }
}

/// Configures a [`Client`].
///
/// [`ClientBuilder::config`] sets the endpoint and the authentication
/// headers the API requires; everything else is optional.
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    retry_strategy: RetryStrategy,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    timeout: Option<Duration>,
    rate_limit_config: RateLimitConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Self {
            base_url: None,
            default_headers,
            retry_strategy: RetryStrategy::None,
            retry_predicate: None,
            timeout: None,
            rate_limit_config: RateLimitConfig::default(),
        }
    }

    /// Uses the endpoint and credentials of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is incomplete, the endpoint is not a
    /// URL, or a credential cannot be sent as a header.
    pub fn config(self, config: &CjaConfig) -> Result<Self> {
        config.validate()?;
        self.base_url(&config.endpoint)?
            .default_header(
                header::AUTHORIZATION.as_str(),
                format!("Bearer {}", config.access_token),
            )?
            .default_header("x-api-key", &config.client_id)?
            .default_header("x-gw-ims-org-id", &config.org_id)
    }

    /// Sets the endpoint all paths are resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a header sent with every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let mut value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        if name == header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Delay schedule for retries; no retries by default.
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Replaces the default [`RetryOnRetryable`] predicate.
    pub fn retry_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// How rate limit headers shape the wait between retries.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// # Errors
    ///
    /// Returns an error if no base URL was set or the HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                retry_strategy: self.retry_strategy,
                retry_predicate: self
                    .retry_predicate
                    .unwrap_or_else(|| Box::new(RetryOnRetryable)),
                timeout: self.timeout,
                rate_limit_config: self.rate_limit_config,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-call request description: method, path, headers and query string.

use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// Everything needed to issue one API call apart from its body.
///
/// Query parameters keep their insertion order and setting an existing key
/// replaces its value in place.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub method: Method,

    /// Path relative to the configured endpoint, e.g. `/filters`.
    pub path: String,

    /// Headers sent in addition to the client defaults.
    pub headers: HeaderMap,

    pub query_params: Vec<(String, String)>,
}

impl RequestMetadata {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a header to this call only.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets a query parameter, replacing any earlier value for `key`.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_query_param(key, value);
        self
    }

    /// Sets `key` only when `value` is present.
    pub fn with_optional_query_param<V: ToString>(
        self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.with_query_param(key, value),
            None => self,
        }
    }

    pub fn set_query_param(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.query_params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.query_params.push((key, value)),
        }
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

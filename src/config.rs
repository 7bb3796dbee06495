//! Connection settings for the Customer Journey Analytics API.
//!
//! Access tokens are obtained outside this crate (for example through an
//! OAuth server-to-server credential) and passed in ready to use.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default API host.
pub const DEFAULT_ENDPOINT: &str = "https://cja.adobe.io";

const ORG_ID_ENV: &str = "CJA_ORG_ID";
const CLIENT_ID_ENV: &str = "CJA_CLIENT_ID";
const ACCESS_TOKEN_ENV: &str = "CJA_ACCESS_TOKEN";
const ENDPOINT_ENV: &str = "CJA_ENDPOINT";

/// Credentials and endpoint of one API connection.
///
/// # Examples
///
/// ```
/// use cja_client::CjaConfig;
///
/// let config: CjaConfig = serde_json::from_str(r#"{
///     "org_id": "ABC123@AdobeOrg",
///     "client_id": "my-api-key",
///     "access_token": "eyJ..."
/// }"#).unwrap();
/// assert_eq!(config.endpoint, "https://cja.adobe.io");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CjaConfig {
    /// IMS organisation id, sent as `x-gw-ims-org-id`.
    pub org_id: String,
    /// API key of the integration, sent as `x-api-key`.
    pub client_id: String,
    /// Bearer token.
    pub access_token: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl CjaConfig {
    pub fn new(
        org_id: impl Into<String>,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            client_id: client_id.into(),
            access_token: access_token.into(),
            endpoint: default_endpoint(),
        }
    }

    /// Points the connection at another host, e.g. a proxy or a mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Loads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::ConfigurationError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), endpoint = %config.endpoint, "Loaded CJA config");
        Ok(config)
    }

    /// Reads `CJA_ORG_ID`, `CJA_CLIENT_ID`, `CJA_ACCESS_TOKEN` and the
    /// optional `CJA_ENDPOINT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            org_id: lookup(ORG_ID_ENV).unwrap_or_default(),
            client_id: lookup(CLIENT_ID_ENV).unwrap_or_default(),
            access_token: lookup(ACCESS_TOKEN_ENV).unwrap_or_default(),
            endpoint: lookup(ENDPOINT_ENV)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_endpoint),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that no required field is empty.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("org_id", &self.org_id),
            ("client_id", &self.client_id),
            ("access_token", &self.access_token),
            ("endpoint", &self.endpoint),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigurationError(format!(
                "missing config values: {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for CjaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CjaConfig")
            .field("org_id", &self.org_id)
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_from_lookup_uses_default_endpoint() {
        let vars: HashMap<&str, &str> = [
            (ORG_ID_ENV, "org@AdobeOrg"),
            (CLIENT_ID_ENV, "key"),
            (ACCESS_TOKEN_ENV, "token"),
        ]
        .into_iter()
        .collect();
        let config = CjaConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.org_id, "org@AdobeOrg");
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let err = CjaConfig::new("org", "", "").validate().unwrap_err();
        match err {
            Error::ConfigurationError(msg) => {
                assert!(msg.contains("client_id"));
                assert!(msg.contains("access_token"));
                assert!(!msg.contains("org_id"));
            }
            other => panic!("expected ConfigurationError, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"org_id": "o", "client_id": "c", "access_token": "t", "endpoint": "http://localhost:9"}}"#
        )
        .unwrap();
        let config = CjaConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9");
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", CjaConfig::new("o", "c", "secret-token"));
        assert!(!rendered.contains("secret-token"));
    }
}

//! Policy engine connection configuration
//!
//! Every invocation constructs a fresh [`EngineConfig`] from CLI flags and
//! environment fallbacks; nothing is persisted between runs. The env var
//! names below are shared with the CLI flag definitions.

use std::path::PathBuf;

use crate::{DEFAULT_ORG_ID, DEFAULT_PORT};

/// Env fallback for the engine hostname
pub const ENV_HOST: &str = "SEGMENT_ENGINE_HOST";
/// Env fallback for the engine port
pub const ENV_PORT: &str = "SEGMENT_ENGINE_PORT";
/// Env fallback for the organization ID
pub const ENV_ORG_ID: &str = "SEGMENT_ENGINE_ORG_ID";
/// Env fallback for the API key username
pub const ENV_API_KEY_USERNAME: &str = "SEGMENT_API_KEY_USERNAME";
/// Env fallback for the API key secret
pub const ENV_API_KEY_SECRET: &str = "SEGMENT_API_KEY_SECRET";

/// Connection settings for the policy engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine hostname or URL; a scheme prefix is tolerated and stripped
    pub hostname: String,
    /// HTTPS port
    pub port: u16,
    /// Organization ID scoping every object collection
    pub org_id: u64,
    /// API key username
    pub api_key_username: String,
    /// API key secret
    pub api_key_secret: String,
    /// Verify the engine's TLS certificate
    pub tls_verify: bool,
    /// Path to a PEM CA bundle used to verify the engine
    pub tls_ca: Option<PathBuf>,
    /// Path to a PEM client certificate for mTLS
    pub tls_client_cert: Option<PathBuf>,
    /// Path to the PEM private key for `tls_client_cert`
    pub tls_client_key: Option<PathBuf>,
    /// Proxy for plain HTTP requests
    pub http_proxy: Option<String>,
    /// Proxy for HTTPS requests
    pub https_proxy: Option<String>,
}

impl EngineConfig {
    /// Create a config with the required credentials and default settings
    pub fn new(
        hostname: impl Into<String>,
        api_key_username: impl Into<String>,
        api_key_secret: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            org_id: DEFAULT_ORG_ID,
            api_key_username: api_key_username.into(),
            api_key_secret: api_key_secret.into(),
            tls_verify: true,
            tls_ca: None,
            tls_client_cert: None,
            tls_client_key: None,
            http_proxy: None,
            https_proxy: None,
        }
    }

    /// Base URL of the engine API, e.g. `https://pce.example.com:443/api/v2`
    pub fn base_url(&self) -> String {
        let host = self
            .hostname
            .trim_end_matches('/')
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        format!("https://{}:{}{}", host, self.port, crate::API_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_from_bare_hostname() {
        let config = EngineConfig::new("pce.example.com", "api_user", "secret");
        assert_eq!(config.base_url(), "https://pce.example.com:443/api/v2");
    }

    #[test]
    fn base_url_strips_scheme_and_trailing_slash() {
        let mut config = EngineConfig::new("https://pce.example.com/", "api_user", "secret");
        config.port = 8443;
        assert_eq!(config.base_url(), "https://pce.example.com:8443/api/v2");
    }
}

//! HTTP transport for the policy engine API
//!
//! [`EngineClient`] wraps a [`reqwest::Client`] configured with API key
//! basic auth, optional custom CA / client identity, and proxies. Every
//! non-2xx response is mapped into the [`ApiError`] taxonomy with the
//! failing operation and target prepended as context. A 404 on a lookup is
//! not an error: the object API reports it as "not found".

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiErrorKind};
use crate::{Error, Result};

use super::config::EngineConfig;

/// Endpoint probed at connect time; org-independent and readable by any
/// valid API key.
const VERSION_RESOURCE: &str = "/product_version";

/// Async HTTP client for the policy engine.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    org_id: u64,
    username: String,
    secret: String,
}

impl EngineClient {
    /// Build a client and verify connectivity with a version probe.
    ///
    /// Mirrors the invocation contract: a config that cannot reach or
    /// authenticate against the engine fails the run before any resource
    /// work starts.
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        let client = Self::build(config)?;
        client.check_connection().await?;
        Ok(client)
    }

    /// Build a client from the config without probing the engine
    pub fn build(config: &EngineConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if !config.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_path) = &config.tls_ca {
            let pem = std::fs::read(ca_path).map_err(|e| {
                Error::validation(format!("failed to read {}: {}", ca_path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| Error::validation(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        match (&config.tls_client_cert, &config.tls_client_key) {
            (Some(cert_path), Some(key_path)) => {
                let mut pem = std::fs::read(cert_path).map_err(|e| {
                    Error::validation(format!("failed to read {}: {}", cert_path.display(), e))
                })?;
                let key = std::fs::read(key_path).map_err(|e| {
                    Error::validation(format!("failed to read {}: {}", key_path.display(), e))
                })?;
                pem.extend_from_slice(&key);
                let identity = reqwest::Identity::from_pem(&pem)
                    .map_err(|e| Error::validation(format!("invalid client identity: {e}")))?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(Error::validation(
                    "tls_client_cert and tls_client_key must be provided together",
                ));
            }
        }

        if let Some(proxy) = &config.http_proxy {
            let proxy = reqwest::Proxy::http(proxy)
                .map_err(|e| Error::validation(format!("invalid http proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        if let Some(proxy) = &config.https_proxy {
            let proxy = reqwest::Proxy::https(proxy)
                .map_err(|e| Error::validation(format!("invalid https proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| Error::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            org_id: config.org_id,
            username: config.api_key_username.clone(),
            secret: config.api_key_secret.clone(),
        })
    }

    /// Probe the engine's version resource to confirm reachability and
    /// credentials
    pub async fn check_connection(&self) -> Result<()> {
        let url = format!("{}{}", self.base_url, VERSION_RESOURCE);
        let context = "failed to establish a connection to the policy engine";
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;
        check_status(response, context).await?;
        debug!(url = %url, "engine connection verified");
        Ok(())
    }

    /// URL of an org-scoped collection, e.g. `.../orgs/1/labels`
    fn collection_url(&self, collection: &str) -> String {
        format!("{}/orgs/{}/{}", self.base_url, self.org_id, collection)
    }

    /// URL of an object href; hrefs are absolute paths under the API prefix
    fn href_url(&self, href: &str) -> String {
        format!("{}{}", self.base_url, href)
    }

    /// Fetch a single object by href; a 404 is reported as `None`
    pub async fn get_by_href<R: DeserializeOwned>(
        &self,
        href: &str,
        kind: &str,
    ) -> Result<Option<R>> {
        let context = format!("failed to get {kind} {href}");
        let response = self
            .http
            .get(self.href_url(href))
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, &context).await?;
        let object = response
            .json::<R>()
            .await
            .map_err(|e| Error::serialization(format!("{context}: {e}")))?;
        Ok(Some(object))
    }

    /// Fetch up to `limit` objects from a collection matching the filter
    pub async fn get_collection<R: DeserializeOwned>(
        &self,
        collection: &str,
        kind: &str,
        filter: &[(&'static str, String)],
        limit: usize,
    ) -> Result<Vec<R>> {
        let context = format!("failed to get {kind} objects");
        let mut query: Vec<(&str, String)> = filter.to_vec();
        query.push(("max_results", limit.to_string()));

        let response = self
            .http
            .get(self.collection_url(collection))
            .query(&query)
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        let response = check_status(response, &context).await?;
        response
            .json::<Vec<R>>()
            .await
            .map_err(|e| Error::serialization(format!("{context}: {e}")))
    }

    /// Create an object; returns the engine's fully populated representation
    pub async fn create<R: DeserializeOwned>(
        &self,
        collection: &str,
        kind: &str,
        body: &impl Serialize,
    ) -> Result<R> {
        let context = format!("failed to create {kind}");
        let response = self
            .http
            .post(self.collection_url(collection))
            .basic_auth(&self.username, Some(&self.secret))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        let response = check_status(response, &context).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| Error::serialization(format!("{context}: {e}")))
    }

    /// Apply a partial update to an object; omitted fields are untouched
    pub async fn update(&self, href: &str, kind: &str, body: &serde_json::Value) -> Result<()> {
        let context = format!("failed to update {kind} {href}");
        let response = self
            .http
            .put(self.href_url(href))
            .basic_auth(&self.username, Some(&self.secret))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        check_status(response, &context).await?;
        Ok(())
    }

    /// Delete an object by href
    pub async fn delete(&self, href: &str, kind: &str) -> Result<()> {
        let context = format!("failed to delete {kind} {href}");
        let response = self
            .http
            .delete(self.href_url(href))
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        check_status(response, &context).await?;
        Ok(())
    }

    /// Mint a pairing key from the given pairing profile
    pub async fn generate_pairing_key(&self, profile_href: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct PairingKeyResponse {
            activation_code: String,
        }

        let context = format!("failed to generate pairing key for profile {profile_href}");
        let url = format!("{}/pairing_key", self.href_url(profile_href));
        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.secret))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        let response = check_status(response, &context).await?;
        let key: PairingKeyResponse = response
            .json()
            .await
            .map_err(|e| Error::serialization(format!("{context}: {e}")))?;
        Ok(key.activation_code)
    }
}

/// Map a response status to the API error taxonomy
fn classify(status: StatusCode) -> ApiErrorKind {
    match status {
        StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiErrorKind::Unauthorized,
        StatusCode::NOT_ACCEPTABLE | StatusCode::CONFLICT => ApiErrorKind::Conflict,
        StatusCode::TOO_MANY_REQUESTS => ApiErrorKind::RateLimited,
        s if s.is_server_error() => ApiErrorKind::ServerError,
        _ => ApiErrorKind::Transport,
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> Error {
    ApiError::new(ApiErrorKind::Transport, context, err.to_string()).into()
}

/// Turn a non-2xx response into an [`ApiError`], passing the engine's body
/// through verbatim
async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    Err(ApiError::new(classify(status), context, message).into())
}

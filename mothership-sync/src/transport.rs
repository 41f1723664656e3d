//! REST transport for the config backend
//!
//! [`Endpoint`] names every route the studio talks to; [`ConfigTransport`] is
//! the seam between sync logic and the network. [`HttpTransport`] is the
//! reqwest implementation used against a live backend.

use crate::error::{SyncError, SyncResult};
use crate::path::FieldPath;
use reqwest::{Client as HttpClient, Method, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default backend address
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Backend routes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/api/config` - full config document
    Config,
    /// `/api/config/memory` - last submitted free-text fields
    Memory,
    /// `/api/config/captions`
    Captions,
    /// `/api/config/music`
    Music,
    /// `/api/config/audio`
    Audio,
    /// `/api/config/voice`
    Voice,
    /// `/api/config/prompts/{category}`
    Prompts(String),
    /// `/api/config/value?path=...`
    Value(FieldPath),
    /// `/api/process`
    Process,
}

impl Endpoint {
    /// Route path without query string
    pub fn route(&self) -> String {
        match self {
            Endpoint::Config => "/api/config".to_string(),
            Endpoint::Memory => "/api/config/memory".to_string(),
            Endpoint::Captions => "/api/config/captions".to_string(),
            Endpoint::Music => "/api/config/music".to_string(),
            Endpoint::Audio => "/api/config/audio".to_string(),
            Endpoint::Voice => "/api/config/voice".to_string(),
            Endpoint::Prompts(category) => format!("/api/config/prompts/{}", category),
            Endpoint::Value(_) => "/api/config/value".to_string(),
            Endpoint::Process => "/api/process".to_string(),
        }
    }

    /// Resolve against `base`, percent-encoding the query where needed
    pub fn url(&self, base: &Url) -> SyncResult<Url> {
        let mut url = base
            .join(&self.route())
            .map_err(|e| SyncError::Transport(format!("Invalid URL for {}: {}", self, e)))?;
        if let Endpoint::Value(path) = self {
            url.query_pairs_mut().append_pair("path", &path.to_string());
        }
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Value(path) => write!(f, "{}?path={}", self.route(), path),
            _ => write!(f, "{}", self.route()),
        }
    }
}

/// Network seam used by [`crate::SyncClient`].
///
/// Every call is a single request with no retry. Non-2xx responses must be
/// reported as [`SyncError::Status`].
#[async_trait::async_trait]
pub trait ConfigTransport: Send + Sync {
    /// GET a JSON document
    async fn get(&self, endpoint: &Endpoint) -> SyncResult<Value>;

    /// Send a JSON body with `PUT` or `POST`, returning the parsed response
    async fn send(&self, method: Method, endpoint: &Endpoint, body: &Value) -> SyncResult<Value>;
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub api_base: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base: Url,
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> SyncResult<Self> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| SyncError::Transport(format!("Invalid API base {:?}: {}", config.api_base, e)))?;

        let client = HttpClient::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    async fn read_body(endpoint: &Endpoint, response: reqwest::Response) -> SyncResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("{} failed with {}: {}", endpoint, status, detail);
            return Err(SyncError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait::async_trait]
impl ConfigTransport for HttpTransport {
    async fn get(&self, endpoint: &Endpoint) -> SyncResult<Value> {
        let url = endpoint.url(&self.base)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read_body(endpoint, response).await
    }

    async fn send(&self, method: Method, endpoint: &Endpoint, body: &Value) -> SyncResult<Value> {
        let url = endpoint.url(&self.base)?;
        debug!("{} {}", method, url);
        let response = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Self::read_body(endpoint, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let base = Url::parse(DEFAULT_API_BASE).unwrap();

        assert_eq!(
            Endpoint::Config.url(&base).unwrap().as_str(),
            "http://localhost:8000/api/config"
        );
        assert_eq!(
            Endpoint::Prompts("military".into()).url(&base).unwrap().as_str(),
            "http://localhost:8000/api/config/prompts/military"
        );

        let path = FieldPath::parse("video_generation.action_level").unwrap();
        assert_eq!(
            Endpoint::Value(path).url(&base).unwrap().as_str(),
            "http://localhost:8000/api/config/value?path=video_generation.action_level"
        );
    }

    #[test]
    fn test_http_transport_rejects_bad_base() {
        let config = TransportConfig {
            api_base: "not a url".to_string(),
            ..Default::default()
        };
        assert!(HttpTransport::new(&config).is_err());
    }
}

//! HTTP client for the avatar proxy endpoint.
//!
//! The proxy answers `GET <endpoint>?userId=<id>` with `200 {"imageUrl": ...}`
//! or `404 {"error": ...}`. Everything else is a transport failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use avatar_core::constants::{DEFAULT_PROXY_URL, PROXY_QUERY_PARAM};
use avatar_core::error::{AvatarError, Result};
use avatar_core::traits::AvatarSource;
use avatar_core::types::PlayerId;

/// Proxy client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Full URL of the proxy route
    pub endpoint: String,
    /// Request timeout in seconds; `None` keeps the transport default
    pub timeout_seconds: Option<u64>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_URL)
    }
}

impl ProxyConfig {
    /// Creates a config pointing at the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_seconds: None,
        }
    }

    /// Sets a request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// Client for the avatar proxy.
#[derive(Clone, Debug)]
pub struct ProxyClient {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl ProxyClient {
    /// Creates a client, validating the endpoint URL.
    pub fn with_config(config: ProxyConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            AvatarError::Config(format!("Invalid proxy endpoint '{}': {}", config.endpoint, e))
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AvatarError::Config(format!(
                "Proxy endpoint must be http(s): {}",
                endpoint
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder
            .build()
            .map_err(|e| AvatarError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches the avatar URL for a player.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: PlayerId) -> Result<String> {
        let key = id.as_key();

        let response = self
            .http_client
            .get(self.endpoint.clone())
            .query(&[(PROXY_QUERY_PARAM, key.as_str())])
            .send()
            .await
            .map_err(|e| AvatarError::Transport(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| AvatarError::Transport(e.to_string()))?;
                let url = parse_success(&body)?;
                debug!(url = %url, "Proxy returned avatar");
                Ok(url)
            }
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ProxyErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.error);
                debug!(?message, "Proxy reported no avatar");
                Err(AvatarError::NotFound { id: key, message })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(AvatarError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl AvatarSource for ProxyClient {
    async fn fetch_avatar_url(&self, id: PlayerId) -> Result<String> {
        self.fetch(id).await
    }
}

fn parse_success(body: &str) -> Result<String> {
    let payload: ProxyAvatarBody = serde_json::from_str(body)
        .map_err(|e| AvatarError::MalformedResponse(format!("Invalid JSON: {}", e)))?;

    payload
        .image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AvatarError::MalformedResponse("Response carried no image URL".into()))
}

#[derive(Debug, Deserialize)]
struct ProxyAvatarBody {
    #[serde(rename = "imageUrl", alias = "url")]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_image_url() {
        let url = parse_success(r#"{"imageUrl":"https://cdn/x.png"}"#).unwrap();
        assert_eq!(url, "https://cdn/x.png");
    }

    #[test]
    fn test_parse_success_url_alias() {
        let url = parse_success(r#"{"url":"https://cdn/y.png","state":"Completed"}"#).unwrap();
        assert_eq!(url, "https://cdn/y.png");
    }

    #[test]
    fn test_parse_success_missing_field() {
        let err = parse_success(r#"{"state":"Pending"}"#).unwrap_err();
        assert!(matches!(err, AvatarError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_success_blank_url() {
        let err = parse_success(r#"{"imageUrl":"  "}"#).unwrap_err();
        assert!(matches!(err, AvatarError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_success_not_json() {
        let err = parse_success("<html>").unwrap_err();
        assert!(matches!(err, AvatarError::MalformedResponse(_)));
    }

    #[test]
    fn test_config_rejects_bad_endpoint() {
        assert!(ProxyClient::with_config(ProxyConfig::new("not a url")).is_err());
        assert!(ProxyClient::with_config(ProxyConfig::new("ftp://host/avatar")).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ProxyConfig::new("https://dash.example.com/api/avatar").with_timeout(5);
        assert_eq!(config.timeout_seconds, Some(5));

        let client = ProxyClient::with_config(config).unwrap();
        assert_eq!(client.endpoint().path(), "/api/avatar");
    }
}

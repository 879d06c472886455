//! HTTP plumbing behind the resource client.
//!
//! [`Transport`] is the seam between the typed client and the network: it
//! only knows how to GET a path and POST a JSON document, returning the raw
//! response body. [`HttpTransport`] is the production implementation on top
//! of `reqwest`; tests plug in an in-memory fake.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::errors::{DealerApiError, Result};

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` relative to the API root and return the body text.
    async fn get(&self, path: &str) -> Result<String>;

    /// POST `body` as JSON to `path` relative to the API root and return the body text.
    async fn post_json(&self, path: &str, body: &Value) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DealerApiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base: config.base()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append the `/`-separated segments of `path` to the API root.
    ///
    /// Each segment is percent-encoded on its own, so characters such as `?`,
    /// `#` or `:` stay inside the path. Dot segments are rejected.
    pub fn build_url(&self, path: &str) -> Result<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(dot) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(DealerApiError::Config(format!(
                "path segment '{}' not allowed in '{}'",
                dot, path
            )));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| DealerApiError::Config(format!("base url {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, url: &Url, request: RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("request timed out: {}", e)
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            DealerApiError::transport(url.as_str(), message)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned {}", url, status);
            return Err(DealerApiError::status(url.as_str(), status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DealerApiError::transport(url.as_str(), format!("failed to read body: {}", e)))?;
        debug!("{} -> {} ({} bytes)", url, status, body.len());
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<String> {
        let url = self.build_url(path)?;
        let request = self.client.get(url.clone());
        self.execute(&url, request).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<String> {
        let url = self.build_url(path)?;
        let request = self.client.post(url.clone()).json(body);
        self.execute(&url, request).await
    }
}

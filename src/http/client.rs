//! HTTP session wrapper
//!
//! Every request a source adapter makes goes through [`HttpClient`], which:
//! - Sends the configured User-Agent and a bounded timeout
//! - Keeps a cookie jar for the lifetime of the session
//! - Converts non-2xx statuses and transport failures into typed errors

use crate::config::HttpConfig;
use crate::{NovelError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A header-bearing HTTP session owned by a single source adapter
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

/// Builds a reqwest client with the session defaults
///
/// # Example
///
/// ```no_run
/// use novelsmith::config::HttpConfig;
/// use novelsmith::http::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10).min(config.timeout()))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

impl HttpClient {
    /// Creates a new session from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = build_http_client(config).map_err(|source| NovelError::Http {
            url: String::new(),
            source,
        })?;
        Ok(Self { inner })
    }

    /// Fetches an HTML (or any text) document
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;
        response.text().await.map_err(|e| classify(url, e))
    }

    /// Fetches a JSON document and decodes it into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| NovelError::parse(url, e))
    }

    /// Fetches binary content such as a cover image
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url).await?;
        let bytes = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        tracing::trace!("GET {}", url);

        let response = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NovelError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

/// Maps a reqwest failure onto the crate's network error variants
fn classify(url: &str, error: reqwest::Error) -> NovelError {
    if error.is_timeout() {
        NovelError::Timeout {
            url: url.to_string(),
        }
    } else {
        NovelError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

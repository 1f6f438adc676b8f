//! reqwest-backed artifact repository client.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ArtifactsConfig;
use crate::error::{BridgeError, Result};
use crate::ports::{HttpResponse, ScriptSource};

/// Plain HTTP GET against the artifact repository.
///
/// Redirects are not followed, so only a direct 200 counts as found.
/// Bodies larger than `max_bytes` are refused.
pub struct HttpScriptSource {
    http: reqwest::Client,
    max_bytes: usize,
}

impl HttpScriptSource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(artifacts: &ArtifactsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(artifacts.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::Http {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            max_bytes: artifacts.max_bytes,
        })
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch(&self, url: &str) -> Result<HttpResponse> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::Http {
                reason: format!("GET {url}: {e}"),
            })?;
        let status = resp.status().as_u16();
        let body = read_capped(resp, url, self.max_bytes).await?;
        tracing::debug!(url = %url, status, bytes = body.len(), "Artifact fetched");
        Ok(HttpResponse { status, body })
    }
}

async fn read_capped(mut resp: reqwest::Response, url: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let too_large = || BridgeError::Http {
        reason: format!("Body of {url} exceeds {max_bytes} bytes"),
    };
    if resp
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(|e| BridgeError::Http {
        reason: format!("Reading body of {url}: {e}"),
    })? {
        if body.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

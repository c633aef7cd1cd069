//! Client side of the file relay.

use async_trait::async_trait;
use docgen::{ByteSource, DocfillError, DocfillResult};
use tracing::debug;

use crate::relay::{RELAY_PATH, TARGET_PARAM};

/// Fetches asset bytes through a relay at `base_url`.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Relay URL for `target`.
    pub fn proxy_url(&self, target: &str) -> String {
        format!(
            "{}{RELAY_PATH}?{TARGET_PARAM}={}",
            self.base_url,
            urlencoding::encode(target)
        )
    }
}

#[async_trait]
impl ByteSource for RelayClient {
    async fn fetch_bytes(&self, url: &str) -> DocfillResult<Vec<u8>> {
        let proxy_url = self.proxy_url(url);
        let response = self
            .http
            .get(&proxy_url)
            .send()
            .await
            .map_err(|e| DocfillError::RelayUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocfillError::RelayFetch {
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DocfillError::RelayUnavailable(e.to_string()))?;
        debug!(size = bytes.len(), "fetched template bytes through relay");
        Ok(bytes.to_vec())
    }
}

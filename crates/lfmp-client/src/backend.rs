//! Transport to the LastFMProxy backend.

use std::time::Duration;

use async_trait::async_trait;
use lfmp_proto::protocol::Endpoint;
use tracing::debug;

use crate::error::ClientError;

/// Fetches the raw response body of one endpoint.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<String, ClientError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(ClientError::BaseUrl(base_url));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("lfmp/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Http {
                path: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn url_for(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<String, ClientError> {
        let path = endpoint.path();
        let url = self.url_for(endpoint);
        debug!("GET {}", url);

        let map_err = |source: reqwest::Error| {
            if source.is_timeout() {
                ClientError::Timeout {
                    path: path.clone(),
                    secs: self.timeout.as_secs(),
                }
            } else {
                ClientError::Http {
                    path: path.clone(),
                    source,
                }
            }
        };

        let resp = self.client.get(&url).send().await.map_err(map_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: path.clone(),
            });
        }
        resp.text().await.map_err(map_err)
    }
}

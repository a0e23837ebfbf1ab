//! HTTP access to the weather API
use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use tokio::time::Duration;
use url::Url;

use crate::error::{AmbientError, ErrorKind, Result};

/// One GET against an API endpoint, returning the decoded JSON body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &str, query: &[(String, String)], timeout: Duration)
        -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| {
            AmbientError::configuration("Failed to build HTTP client").with_source(e)
        })?;

        Ok(HttpTransport {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint)).map_err(|e| {
            AmbientError::configuration(format!("Invalid endpoint URL for {}", endpoint))
                .with_source(e)
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

/// Tag a client-side failure: timeouts and missing responses are transient,
/// responses with an error status are classified by status.
fn classify(err: reqwest::Error) -> AmbientError {
    let tagged = if err.is_timeout() {
        AmbientError::new(ErrorKind::Timeout, "Request timeout. Please try again.")
    } else if let Some(status) = err.status() {
        AmbientError::from_status(status.as_u16())
    } else if err.is_decode() {
        AmbientError::new(
            ErrorKind::InvalidResponseFormat,
            "Response body is not valid JSON",
        )
    } else {
        AmbientError::new(
            ErrorKind::Network,
            "Network error. Please check your connection.",
        )
    };
    tagged.with_source(err)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<Value> {
        let url = self.endpoint_url(endpoint, query)?;
        debug!("GET {}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AmbientError::from_status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(classify)
    }
}

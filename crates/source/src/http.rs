use std::time::Duration;

use async_trait::async_trait;
use pricewatch_core::config::{ConfigError, SourceConfig, BARCODE_PLACEHOLDER};
use pricewatch_core::{Barcode, FetchError, FetchResult, PriceFetcher};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::extract::extract_offer;

#[derive(Debug, Error)]
pub enum SourceInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Fetches prices with one `GET` per barcode against a templated URL.
#[derive(Clone, Debug)]
pub struct HttpPriceFetcher {
    client: Client,
    url_template: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpPriceFetcher {
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceInitError> {
        let url_template = config.require_endpoint()?.to_owned();
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            url_template,
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn url_for(&self, barcode: &Barcode) -> String {
        self.url_template.replace(BARCODE_PLACEHOLDER, barcode.as_str())
    }

    fn map_transport_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::TransientNetwork(error.to_string())
        }
    }
}

/// Maps a non-success status to the fetch error it represents.
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    if status == StatusCode::NOT_FOUND {
        return Some(FetchError::NotFound);
    }
    Some(FetchError::TransientNetwork(format!("price source answered {status}")))
}

#[async_trait]
impl PriceFetcher for HttpPriceFetcher {
    async fn fetch(&self, barcode: &Barcode) -> FetchResult {
        let url = self.url_for(barcode);
        let mut request = self.client.get(&url).header("accept", "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| self.map_transport_error(error))?;
        let status = response.status();
        debug!(
            event_name = "source.response",
            barcode = %barcode,
            status = status.as_u16(),
            "price source responded"
        );
        if let Some(error) = classify_status(status) {
            return Err(error);
        }

        let body = response.bytes().await.map_err(|error| self.map_transport_error(error))?;
        let value: Value = serde_json::from_slice(&body)
            .map_err(|error| FetchError::MalformedResponse(format!("body is not JSON: {error}")))?;

        extract_offer(&value)
    }
}

//! HTTP client for the JSONBlob API.
//!
//! - `POST {base}` creates a blob
//! - `GET {base}/{id}` fetches it (404 when absent)
//! - `PUT {base}/{id}` replaces it

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;

use super::discovery::discover_document_id;
use super::{HubClient, HubError};

/// Public JSONBlob endpoint.
pub const DEFAULT_HUB_URL: &str = "https://jsonblob.com/api/jsonBlob";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct JsonBlobClient {
    base_url: String,
    http: reqwest::Client,
}

impl JsonBlobClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HubError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id.trim())
    }
}

#[async_trait]
impl HubClient for JsonBlobClient {
    async fn create_document(&self, payload: &Value) -> Result<String, HubError> {
        let response = self
            .http
            .post(&self.base_url)
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Status(status.as_u16()));
        }

        let headers = response.headers().clone();
        let body = response.text().await?;

        let id = discover_document_id(&headers, &body).ok_or(HubError::MissingId)?;
        tracing::debug!("Hub created document {}", id);
        Ok(id)
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<Value>, HubError> {
        let response = self
            .http
            .get(self.document_url(id))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await?;
                serde_json::from_str(&body)
                    .map(Some)
                    .map_err(|e| HubError::Malformed(e.to_string()))
            }
            status => Err(HubError::Status(status.as_u16())),
        }
    }

    async fn put_document(&self, id: &str, payload: &Value) -> Result<(), HubError> {
        let response = self
            .http
            .put(self.document_url(id))
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(HubError::NotFound(id.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(HubError::Status(status.as_u16())),
        }
    }
}

//! Producer-side HTTP client: submit canonical events and publish messages.

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::event::CanonicalEvent;
use crate::objects::publish::{IngestResponse, PublishReport, PublishRequest};

/// Typed HTTP client for the ingest and publish endpoints.
#[derive(Debug, Clone)]
pub struct IngestClient {
    http: Client,
    base_url: Url,
}

impl IngestClient {
    /// Create a new `IngestClient` rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /events` – submit a batch of completed games.
    pub async fn submit_events(
        &self,
        events: &[CanonicalEvent],
    ) -> Result<IngestResponse, ClientError> {
        let url = self.base_url.join("/events")?;
        let resp = self.http.post(url).json(events).send().await?;
        parse_response(resp).await
    }

    /// `POST /publish` – publish directly to a channel, bypassing the
    /// detector.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishReport, ClientError> {
        let url = self.base_url.join("/publish")?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use qchat_core::{ByteStream, ChatRequest, Credential, Model, ModelCatalog, Transport, TransportError};
use qchat_logging::{redact_secret, redact_sensitive_data};

/// Header carrying the credential on every request.
pub const API_KEY_HEADER: &str = "api-key";

pub const DEFAULT_API_URL: &str = "https://api.qbraid.com/api/chat";

/// Client for the hosted chat API.
///
/// `POST {base}` streams a response body; `GET {base}/models` both validates
/// the key and lists the catalog.
#[derive(Debug, Clone)]
pub struct QbraidClient {
    client: Client,
    base_url: String,
}

impl QbraidClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    async fn fetch_models(&self, credential: &Credential) -> Result<Vec<Model>> {
        let response = self
            .client
            .get(self.models_url())
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .context("Model catalog request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Model catalog returned {}", status);
        }

        response
            .json::<Vec<Model>>()
            .await
            .context("Failed to parse model catalog")
    }
}

impl Default for QbraidClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[async_trait]
impl Transport for QbraidClient {
    fn name(&self) -> &str {
        "qbraid"
    }

    async fn open_stream(
        &self,
        request: &ChatRequest,
        credential: &Credential,
    ) -> Result<ByteStream, TransportError> {
        debug!(model = %request.model, "Sending chat request");

        let response = self
            .client
            .post(&self.base_url)
            .header(API_KEY_HEADER, credential.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = redact_secret(&redact_sensitive_data(&body), credential.expose());
            warn!(status = status.as_u16(), body = %body, "Chat endpoint rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Body(e.without_url().to_string())));
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ModelCatalog for QbraidClient {
    async fn validate_credential(&self, credential: &Credential) -> bool {
        let response = self
            .client
            .get(self.models_url())
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await;

        match response {
            Ok(r) => {
                debug!(status = r.status().as_u16(), "Credential check");
                r.status() == StatusCode::OK
            }
            Err(e) => {
                debug!(error = %e.without_url(), "Credential check failed");
                false
            }
        }
    }

    async fn list_models(&self, credential: &Credential) -> Vec<Model> {
        match self.fetch_models(credential).await {
            Ok(models) => models,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to fetch models");
                Vec::new()
            }
        }
    }
}

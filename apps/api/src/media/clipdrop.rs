use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart::Form, Client};
use serde::Deserialize;
use tracing::debug;

use super::{ImageGenerator, MediaError};

const SERVICE: &str = "Clipdrop";

#[derive(Debug, Deserialize)]
struct ClipdropError {
    error: String,
}

/// Clipdrop text-to-image client.
#[derive(Clone)]
pub struct ClipdropClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClipdropClient {
    pub fn new(client: Client, api_key: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for ClipdropClient {
    async fn generate(&self, prompt: &str) -> Result<Bytes, MediaError> {
        let form = Form::new().text("prompt", prompt.to_string());

        let response = self
            .client
            .post(format!("{}/text-to-image/v1", self.base_url))
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ClipdropError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(MediaError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let image = response.bytes().await?;
        if image.is_empty() {
            return Err(MediaError::Empty { service: SERVICE });
        }
        debug!("Clipdrop returned {} bytes", image.len());
        Ok(image)
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{IdentityError, IdentityProvider, IdentityUser};

#[derive(Debug, Deserialize)]
struct ClerkErrors {
    errors: Vec<ClerkErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ClerkErrorEntry {
    message: String,
    long_message: Option<String>,
}

/// Clerk Backend API client, authenticated with the instance secret key.
#[derive(Clone)]
pub struct ClerkClient {
    client: Client,
    secret_key: String,
    api_url: String,
}

impl ClerkClient {
    pub fn new(client: Client, secret_key: String, api_url: &str) -> Self {
        Self {
            client,
            secret_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ClerkErrors>(&body)
            .ok()
            .and_then(|e| e.errors.into_iter().next())
            .map(|e| e.long_message.unwrap_or(e.message))
            .unwrap_or(body);
        Err(IdentityError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .client
            .get(format!("{}/v1/users/{}", self.api_url, user_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let user: IdentityUser = Self::check(response).await?.json().await?;
        debug!("Fetched identity record for {}", user.id);
        Ok(user)
    }

    async fn set_free_usage(&self, user_id: &str, free_usage: u32) -> Result<(), IdentityError> {
        let response = self
            .client
            .patch(format!("{}/v1/users/{}/metadata", self.api_url, user_id))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "private_metadata": { "free_usage": free_usage } }))
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Set free_usage={free_usage} for {user_id}");
        Ok(())
    }
}

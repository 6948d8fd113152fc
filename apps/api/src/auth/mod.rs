//! Caller identity: session-token verification, the identity provider's
//! user records, and the plan gate that turns both into a `PlanContext`.

pub mod clerk;
pub mod middleware;
pub mod session;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::user::Plan;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// A user record as held by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub public_metadata: Value,
    #[serde(default)]
    pub private_metadata: Value,
}

impl IdentityUser {
    /// Premium if either metadata bag says so.
    pub fn has_premium_plan(&self) -> bool {
        let is_premium = |meta: &Value| meta.get("plan").and_then(Value::as_str) == Some("premium");
        is_premium(&self.public_metadata) || is_premium(&self.private_metadata)
    }

    pub fn plan(&self) -> Plan {
        if self.has_premium_plan() {
            Plan::Premium
        } else {
            Plan::Free
        }
    }

    /// The counter stored in private metadata, if one has been written.
    pub fn free_usage(&self) -> Option<u32> {
        self.private_metadata
            .get("free_usage")
            .and_then(Value::as_u64)
            .map(|n| n.min(u32::MAX as u64) as u32)
    }
}

/// User lookup and metadata writes against the identity provider.
/// Carried in `AppState` as `Arc<dyn IdentityProvider>`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, IdentityError>;

    /// Merges `free_usage` into the user's private metadata.
    async fn set_free_usage(&self, user_id: &str, free_usage: u32) -> Result<(), IdentityError>;
}

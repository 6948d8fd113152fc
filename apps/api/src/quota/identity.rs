use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::QuotaStore;
use crate::auth::{IdentityProvider, IdentityUser};
use crate::errors::AppError;

/// Counter kept in the identity provider's private metadata.
///
/// The provider offers no compare-and-swap, so `increment` is a read followed
/// by a write: two concurrent increments for one user can collapse into one.
/// Prefer `PgQuotaStore` wherever the table is available.
#[derive(Clone)]
pub struct IdentityQuotaStore {
    identity: Arc<dyn IdentityProvider>,
}

impl IdentityQuotaStore {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl QuotaStore for IdentityQuotaStore {
    async fn current_or_init(&self, user_id: &str) -> Result<u32, AppError> {
        let user = self.identity.get_user(user_id).await?;
        self.current_or_init_for(&user).await
    }

    async fn current_or_init_for(&self, user: &IdentityUser) -> Result<u32, AppError> {
        match user.free_usage() {
            Some(n) => Ok(n),
            None => {
                debug!("Initializing free usage counter for {}", user.id);
                self.identity.set_free_usage(&user.id, 0).await?;
                Ok(0)
            }
        }
    }

    async fn increment(&self, user_id: &str) -> Result<u32, AppError> {
        let user = self.identity.get_user(user_id).await?;
        let next = user.free_usage().unwrap_or(0).saturating_add(1);
        self.identity.set_free_usage(user_id, next).await?;
        Ok(next)
    }
}

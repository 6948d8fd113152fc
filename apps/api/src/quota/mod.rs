//! Free-usage counters.
//!
//! `AppState` holds an `Arc<dyn QuotaStore>`; the backend is picked at
//! startup from `QUOTA_BACKEND`.

pub mod identity;
pub mod postgres;

use async_trait::async_trait;

use crate::auth::IdentityUser;
use crate::errors::AppError;
use crate::models::user::{Plan, PlanContext};

#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Returns the caller's counter, creating it at 0 if it does not exist yet.
    /// An existing counter is never reset.
    async fn current_or_init(&self, user_id: &str) -> Result<u32, AppError>;

    /// Same as `current_or_init`, for a caller whose record the plan gate has
    /// already fetched.
    async fn current_or_init_for(&self, user: &IdentityUser) -> Result<u32, AppError> {
        self.current_or_init(&user.id).await
    }

    /// Adds one to the caller's counter and returns the new value.
    async fn increment(&self, user_id: &str) -> Result<u32, AppError>;
}

/// Rejects free callers that have used up `limit` metered actions.
/// `None` means no limit is enforced.
pub fn ensure_within_limit(ctx: &PlanContext, limit: Option<u32>) -> Result<(), AppError> {
    match (ctx.plan, limit) {
        (Plan::Free, Some(limit)) if ctx.free_usage >= limit => Err(AppError::QuotaExceeded),
        _ => Ok(()),
    }
}

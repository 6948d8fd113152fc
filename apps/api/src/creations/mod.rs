//! Creation history: the append-only audit trail of completed actions.

pub mod handlers;
pub mod store;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::creation::{CreationRow, NewCreation};

/// Carried in `AppState` as `Arc<dyn CreationStore>`.
#[async_trait]
pub trait CreationStore: Send + Sync {
    /// Appends one row. Rows are never updated or deleted.
    async fn insert(&self, creation: &NewCreation) -> Result<(), AppError>;

    /// The caller's own creations, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CreationRow>, AppError>;

    /// Every creation flagged for publication, newest first.
    async fn list_published(&self) -> Result<Vec<CreationRow>, AppError>;
}

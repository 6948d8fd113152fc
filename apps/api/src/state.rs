use std::sync::Arc;

use crate::auth::session::SessionVerifier;
use crate::auth::IdentityProvider;
use crate::config::Config;
use crate::creations::CreationStore;
use crate::llm_client::TextModel;
use crate::media::{ImageGenerator, MediaStore};
use crate::quota::QuotaStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every external collaborator sits behind a trait object so it can be swapped
/// at startup (or faked in tests).
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Postgres-backed by default. Swap via QUOTA_BACKEND.
    pub quota: Arc<dyn QuotaStore>,
    pub llm: Arc<dyn TextModel>,
    pub images: Arc<dyn ImageGenerator>,
    pub media: Arc<dyn MediaStore>,
    pub creations: Arc<dyn CreationStore>,
}

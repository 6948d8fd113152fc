// AI actions: one handler per capability.
// Every handler validates its input, makes exactly one generation call,
// appends one creation row on success, and answers with the shared envelope.

pub mod handlers;
pub mod prompts;
pub mod upload;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::creation::{CreationType, NewCreation};
use crate::models::envelope::ActionOutcome;
use crate::models::user::PlanContext;
use crate::quota::ensure_within_limit;
use crate::state::AppState;

/// The capabilities exposed under `/api/ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Article,
    BlogTitle,
    Image,
    RemoveBackground,
    RemoveObject,
    ResumeReview,
}

impl Action {
    pub fn creation_type(&self) -> CreationType {
        match self {
            Action::Article => CreationType::Article,
            Action::BlogTitle => CreationType::BlogArticle,
            Action::Image | Action::RemoveBackground | Action::RemoveObject => CreationType::Image,
            Action::ResumeReview => CreationType::ResumeReview,
        }
    }

    /// Whether a successful run counts against the free tier.
    ///
    /// Only title generation is metered. Extending this to every action would
    /// change what free users can do, so it stays a deliberate one-line switch.
    pub fn is_metered(&self) -> bool {
        matches!(self, Action::BlogTitle)
    }
}

/// Blocks metered actions for free callers over the configured limit.
pub fn check_quota(state: &AppState, ctx: &PlanContext, action: Action) -> Result<(), AppError> {
    if action.is_metered() {
        ensure_within_limit(ctx, state.config.free_usage_limit)?;
    }
    Ok(())
}

/// Appends the creation row, bumps the free-usage counter for metered actions,
/// and returns the content that was stored.
pub async fn complete_action(
    state: &AppState,
    ctx: &PlanContext,
    action: Action,
    creation: NewCreation,
) -> Result<ActionOutcome, AppError> {
    state.creations.insert(&creation).await?;

    if action.is_metered() && !ctx.plan.is_premium() {
        // The output already exists and is recorded; a failed bump is logged,
        // not reported as a failed action.
        match state.quota.increment(&ctx.user_id).await {
            Ok(n) => debug!("free_usage for {} is now {n}", ctx.user_id),
            Err(e) => warn!("Failed to increment free usage for {}: {e}", ctx.user_id),
        }
    }

    Ok(ActionOutcome::success(creation.content))
}

/// JSON body extractor whose rejection uses the action envelope.
pub struct ActionJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ActionJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!("Rejected JSON body: {}", e.body_text());
            AppError::Validation("Invalid request body".to_string())
        })?;
        Ok(ActionJson(value))
    }
}

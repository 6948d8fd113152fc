//! Plan gate: runs in front of every `/api` route.
//!
//! Resolves the caller from the bearer token, looks up their plan with the
//! identity provider, makes sure a free-usage counter exists, and attaches a
//! `PlanContext` to the request before forwarding.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::session::bearer_token;
use crate::auth::IdentityProvider;
use crate::errors::AppError;
use crate::models::user::{Plan, PlanContext};
use crate::quota::QuotaStore;
use crate::state::AppState;

pub async fn plan_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let user_id = state.sessions.verify(token).map_err(|e| {
        debug!("Session verification failed: {e}");
        AppError::Unauthorized
    })?;

    let ctx = resolve_plan(state.identity.as_ref(), state.quota.as_ref(), &user_id)
        .await
        .map_err(AppError::in_plan_gate)?;
    debug!(
        "Resolved {} plan for {} (free_usage={})",
        ctx.plan.as_str(),
        ctx.user_id,
        ctx.free_usage
    );

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Plan and usage for `user_id`. Premium callers report zero usage and never
/// touch the counter; free callers get their counter created on first sight.
pub async fn resolve_plan(
    identity: &dyn IdentityProvider,
    quota: &dyn QuotaStore,
    user_id: &str,
) -> Result<PlanContext, AppError> {
    let user = identity.get_user(user_id).await?;
    let plan = user.plan();

    let free_usage = match plan {
        Plan::Premium => 0,
        Plan::Free => quota.current_or_init_for(&user).await?,
    };

    Ok(PlanContext {
        user_id: user_id.to_string(),
        plan,
        free_usage,
    })
}

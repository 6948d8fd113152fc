use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::creation::CreationRow;
use crate::models::user::PlanContext;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreationsResponse {
    pub success: bool,
    pub creations: Vec<CreationRow>,
}

/// GET /api/user/get-user-creations
pub async fn handle_user_creations(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
) -> Result<Json<CreationsResponse>, AppError> {
    let creations = state.creations.list_for_user(&ctx.user_id).await?;
    Ok(Json(CreationsResponse {
        success: true,
        creations,
    }))
}

/// GET /api/user/get-published-creations
pub async fn handle_published_creations(
    State(state): State<AppState>,
) -> Result<Json<CreationsResponse>, AppError> {
    let creations = state.creations.list_published().await?;
    Ok(Json(CreationsResponse {
        success: true,
        creations,
    }))
}

//! Axum route handlers for the AI actions.

use axum::{extract::State, Extension};
use serde::Deserialize;
use tracing::info;

use crate::actions::prompts::{
    article_max_tokens, article_prompt, object_removal_prompt, resume_review_prompt,
    BACKGROUND_REMOVAL_PROMPT, DEFAULT_ARTICLE_LENGTH, RESUME_REVIEW_PROMPT, TEMPERATURE,
    TITLE_MAX_TOKENS,
};
use crate::actions::upload::UploadForm;
use crate::actions::{check_quota, complete_action, Action, ActionJson};
use crate::documents::extract_pdf_text;
use crate::errors::AppError;
use crate::llm_client::ChatRequest;
use crate::media::{to_data_uri, to_png_data_uri};
use crate::models::creation::NewCreation;
use crate::models::envelope::ActionOutcome;
use crate::models::user::PlanContext;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub publish: Option<bool>,
}

/// The prompt exactly as sent; whitespace-only counts as missing.
fn required_prompt(prompt: Option<&str>) -> Result<&str, AppError> {
    prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/ai/generate-article
pub async fn handle_generate_article(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
    ActionJson(request): ActionJson<ArticleRequest>,
) -> Result<ActionOutcome, AppError> {
    let action = Action::Article;
    let prompt = required_prompt(request.prompt.as_deref())?;
    check_quota(&state, &ctx, action)?;

    let length = request
        .length
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_ARTICLE_LENGTH);

    let content = state
        .llm
        .chat(ChatRequest {
            prompt: article_prompt(prompt, length),
            temperature: TEMPERATURE,
            max_tokens: article_max_tokens(length),
        })
        .await?;

    complete_action(
        &state,
        &ctx,
        action,
        NewCreation::new(&ctx.user_id, prompt, content, action.creation_type()),
    )
    .await
}

/// POST /api/ai/generate-blog-title
pub async fn handle_generate_blog_title(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
    ActionJson(request): ActionJson<TitleRequest>,
) -> Result<ActionOutcome, AppError> {
    let action = Action::BlogTitle;
    let prompt = required_prompt(request.prompt.as_deref())?;
    check_quota(&state, &ctx, action)?;

    let content = state
        .llm
        .chat(ChatRequest {
            prompt: prompt.to_string(),
            temperature: TEMPERATURE,
            max_tokens: TITLE_MAX_TOKENS,
        })
        .await?;

    complete_action(
        &state,
        &ctx,
        action,
        NewCreation::new(&ctx.user_id, prompt, content, action.creation_type()),
    )
    .await
}

/// POST /api/ai/generate-image
///
/// Synthesizes an image, re-hosts it on the media store, and records the
/// hosted URL. `publish` makes it visible in the community feed.
pub async fn handle_generate_image(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
    ActionJson(request): ActionJson<ImageRequest>,
) -> Result<ActionOutcome, AppError> {
    let action = Action::Image;
    let prompt = required_prompt(request.prompt.as_deref())?;
    check_quota(&state, &ctx, action)?;

    let png = state.images.generate(prompt).await?;
    let asset = state.media.upload(to_png_data_uri(&png), None).await?;
    info!("Generated image {} for {}", asset.public_id, ctx.user_id);

    complete_action(
        &state,
        &ctx,
        action,
        NewCreation::new(&ctx.user_id, prompt, asset.secure_url, action.creation_type())
            .published(request.publish.unwrap_or(false)),
    )
    .await
}

/// POST /api/ai/remove-image-background (multipart: `image`)
pub async fn handle_remove_image_background(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
    form: UploadForm,
) -> Result<ActionOutcome, AppError> {
    let action = Action::RemoveBackground;
    let image = form
        .file("image")
        .ok_or_else(|| AppError::Validation("No image uploaded".to_string()))?;
    if !image.is_image() {
        return Err(AppError::Validation("Uploaded file must be an image".to_string()));
    }
    check_quota(&state, &ctx, action)?;

    let asset = state
        .media
        .upload(
            to_data_uri(image.image_content_type(), &image.bytes),
            Some("e_background_removal".to_string()),
        )
        .await?;

    complete_action(
        &state,
        &ctx,
        action,
        NewCreation::new(
            &ctx.user_id,
            BACKGROUND_REMOVAL_PROMPT,
            asset.secure_url,
            action.creation_type(),
        ),
    )
    .await
}

/// POST /api/ai/remove-image-object (multipart: `image`, `object`)
///
/// The object label is required up front: without it there is no effect to
/// apply, so nothing is uploaded.
pub async fn handle_remove_image_object(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
    form: UploadForm,
) -> Result<ActionOutcome, AppError> {
    let action = Action::RemoveObject;
    let image = form
        .file("image")
        .ok_or_else(|| AppError::Validation("No image uploaded".to_string()))?;
    if !image.is_image() {
        return Err(AppError::Validation("Uploaded file must be an image".to_string()));
    }
    let object = form
        .text("object")
        .ok_or_else(|| AppError::Validation("Object name is required".to_string()))?;
    check_quota(&state, &ctx, action)?;

    let asset = state
        .media
        .upload(to_data_uri(image.image_content_type(), &image.bytes), None)
        .await?;
    let image_url = state
        .media
        .transformed_url(&asset.public_id, &format!("gen_remove:{object}"))?;

    complete_action(
        &state,
        &ctx,
        action,
        NewCreation::new(
            &ctx.user_id,
            object_removal_prompt(object),
            image_url,
            action.creation_type(),
        ),
    )
    .await
}

/// POST /api/ai/resume-review (multipart: `resume`)
pub async fn handle_resume_review(
    State(state): State<AppState>,
    Extension(ctx): Extension<PlanContext>,
    form: UploadForm,
) -> Result<ActionOutcome, AppError> {
    let action = Action::ResumeReview;
    let resume = form
        .file("resume")
        .ok_or_else(|| AppError::Validation("No resume uploaded".to_string()))?;
    if !resume.is_pdf() {
        return Err(AppError::Validation("Resume must be a PDF file".to_string()));
    }
    check_quota(&state, &ctx, action)?;
    info!("Reviewing resume {:?} for {}", resume.file_name, ctx.user_id);

    let resume_text = extract_pdf_text(resume.bytes.clone()).await?;
    let content = state.llm.generate(&resume_review_prompt(&resume_text)).await?;

    complete_action(
        &state,
        &ctx,
        action,
        NewCreation::new(&ctx.user_id, RESUME_REVIEW_PROMPT, content, action.creation_type()),
    )
    .await
}

pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::actions::handlers;
use crate::auth::middleware::plan_gate;
use crate::creations::handlers as creation_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let ai = Router::new()
        .route("/generate-article", post(handlers::handle_generate_article))
        .route(
            "/generate-blog-title",
            post(handlers::handle_generate_blog_title),
        )
        .route("/generate-image", post(handlers::handle_generate_image))
        .route(
            "/remove-image-background",
            post(handlers::handle_remove_image_background),
        )
        .route(
            "/remove-image-object",
            post(handlers::handle_remove_image_object),
        )
        .route("/resume-review", post(handlers::handle_resume_review));

    let user = Router::new()
        .route(
            "/get-user-creations",
            get(creation_handlers::handle_user_creations),
        )
        .route(
            "/get-published-creations",
            get(creation_handlers::handle_published_creations),
        );

    let api = Router::new()
        .nest("/ai", ai)
        .nest("/user", user)
        .layer(middleware::from_fn_with_state(state.clone(), plan_gate));

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}

mod actions;
mod auth;
mod config;
mod creations;
mod db;
mod documents;
mod errors;
mod llm_client;
mod media;
mod models;
mod quota;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::clerk::ClerkClient;
use crate::auth::session::ClerkSessionVerifier;
use crate::auth::IdentityProvider;
use crate::config::{Config, QuotaBackend};
use crate::creations::store::PgCreationStore;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::LlmClient;
use crate::media::clipdrop::ClipdropClient;
use crate::media::cloudinary::CloudinaryClient;
use crate::quota::identity::IdentityQuotaStore;
use crate::quota::postgres::PgQuotaStore;
use crate::quota::QuotaStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Shared HTTP client for the media and identity services
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("Failed to build HTTP client")?;

    let sessions = ClerkSessionVerifier::from_pem(
        &config.clerk_jwt_key,
        config.clerk_authorized_parties.clone(),
    )
    .context("CLERK_JWT_KEY is not a valid RSA public key")?;

    let identity: Arc<dyn IdentityProvider> = Arc::new(ClerkClient::new(
        http.clone(),
        config.clerk_secret_key.clone(),
        &config.clerk_api_url,
    ));

    let quota: Arc<dyn QuotaStore> = match config.quota_backend {
        QuotaBackend::Postgres => Arc::new(PgQuotaStore::new(db.clone())),
        QuotaBackend::Identity => Arc::new(IdentityQuotaStore::new(identity.clone())),
    };
    info!("Quota backend: {:?}", config.quota_backend);
    match config.free_usage_limit {
        Some(limit) => info!("Free usage limit enforced at {limit}"),
        None => info!("Free usage limit not enforced"),
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini_api_key.clone(), &config.gemini_base_url)?;
    info!(
        "LLM client initialized (chat: {}, review: {})",
        llm_client::CHAT_MODEL,
        llm_client::REVIEW_MODEL
    );

    let images = ClipdropClient::new(
        http.clone(),
        config.clipdrop_api_key.clone(),
        &config.clipdrop_base_url,
    );
    let media = CloudinaryClient::new(
        http,
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
        &config.cloudinary_base_url,
    )
    .with_signature_algorithm(config.cloudinary_signature_algorithm);

    // Build app state
    let state = AppState {
        config: config.clone(),
        sessions: Arc::new(sessions),
        identity,
        quota,
        llm: Arc::new(llm),
        images: Arc::new(images),
        media: Arc::new(media),
        creations: Arc::new(PgCreationStore::new(db)),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

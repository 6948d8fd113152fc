use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

const SCHEMA: &str = include_str!("../migrations/schema.sql");

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the bootstrap schema. Every statement is `IF NOT EXISTS`, so this
/// is safe to run on every start.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    // A plain &str runs over the simple-query protocol, which accepts
    // several statements at once.
    pool.execute(SCHEMA)
        .await
        .context("Failed to apply bootstrap schema")?;
    info!("Database schema is up to date");
    Ok(())
}

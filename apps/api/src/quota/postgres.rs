use async_trait::async_trait;
use sqlx::PgPool;

use super::QuotaStore;
use crate::errors::AppError;

/// Counters in `usage_counters`. Each operation is a single upsert, so
/// concurrent requests from one user cannot lose updates.
#[derive(Clone)]
pub struct PgQuotaStore {
    pool: PgPool,
}

impl PgQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    async fn current_or_init(&self, user_id: &str) -> Result<u32, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let free_usage: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO usage_counters (user_id, free_usage)
            VALUES ($1, 0)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING free_usage
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(free_usage.max(0) as u32)
    }

    async fn increment(&self, user_id: &str) -> Result<u32, AppError> {
        let free_usage: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO usage_counters (user_id, free_usage)
            VALUES ($1, 1)
            ON CONFLICT (user_id)
            DO UPDATE SET free_usage = usage_counters.free_usage + 1, updated_at = NOW()
            RETURNING free_usage
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(free_usage.max(0) as u32)
    }
}

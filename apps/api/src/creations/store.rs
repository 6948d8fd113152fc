use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::CreationStore;
use crate::errors::AppError;
use crate::models::creation::{CreationRow, NewCreation};

#[derive(Clone)]
pub struct PgCreationStore {
    pool: PgPool,
}

impl PgCreationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreationStore for PgCreationStore {
    async fn insert(&self, creation: &NewCreation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO creations (user_id, prompt, content, type, publish)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&creation.user_id)
        .bind(&creation.prompt)
        .bind(&creation.content)
        .bind(creation.kind.as_str())
        .bind(creation.publish)
        .execute(&self.pool)
        .await?;

        info!(
            "Recorded {} creation for user {}",
            creation.kind.as_str(),
            creation.user_id
        );
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CreationRow>, AppError> {
        let rows = sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_published(&self) -> Result<Vec<CreationRow>, AppError> {
        let rows = sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE publish = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

//! PostgreSQL adapter for the user directory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{StorageError, UserId};
use crate::ports::UserDirectory;

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn ensure(&self, user_id: UserId) -> Result<(), StorageError> {
        // Only the key is inserted; an existing row is never touched.
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn mark_trial_used(&self, user_id: UserId) -> Result<(), StorageError> {
        // Monotonic: the flag is only ever set, and the original timestamp
        // is kept on replay.
        sqlx::query(
            r#"
            UPDATE users
            SET trial_used = TRUE,
                trial_used_at = COALESCE(trial_used_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}

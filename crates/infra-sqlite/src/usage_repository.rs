// SQLite UsageRecorder Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use studio_core::error::Result;
use studio_core::port::{TimeProvider, UsageRecorder};
use tracing::debug;

pub struct SqliteUsageRecorder {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteUsageRecorder {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl UsageRecorder for SqliteUsageRecorder {
    async fn increment(&self, feature: &str, amount: i64) -> Result<()> {
        let now = self.time_provider.now_millis();

        // Single upsert so concurrent increments never lose a count
        sqlx::query(
            r#"
            INSERT INTO usage_counters (feature, count, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(feature) DO UPDATE SET
                count = count + excluded.count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(feature)
        .bind(amount)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(feature = %feature, amount, "Usage recorded");
        Ok(())
    }

    async fn total(&self, feature: &str) -> Result<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM usage_counters WHERE feature = ?")
                .bind(feature)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count.unwrap_or(0))
    }
}

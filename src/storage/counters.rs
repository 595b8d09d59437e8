use anyhow::Result;

use super::db::Database;

/// Durable counter key for the session card view total.
pub const CARDS_VIEWED_KEY: &str = "news.cards_viewed";

impl Database {
    // ========================================================================
    // Counter Operations
    // ========================================================================

    /// Read a counter value; a key that was never written reads as 0.
    ///
    /// Keys use dotted convention: `news.cards_viewed`, etc.
    pub async fn read_counter(&self, key: &str) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM counters WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value).unwrap_or(0))
    }

    /// Set a counter value (UPSERT).
    pub async fn write_counter(&self, key: &str, value: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO counters (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Increment a counter by 1 and return the new value.
    ///
    /// A single UPSERT statement, so concurrent increments never lose an
    /// update. The counter is monotonic: nothing here ever decrements it.
    pub async fn increment_counter(&self, key: &str) -> Result<i64> {
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO counters (key, value, updated_at)
            VALUES (?, 1, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = value + 1,
                updated_at = excluded.updated_at
            RETURNING value
        "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    /// Explicit external reset. The only path that takes a counter back
    /// toward zero.
    pub async fn reset_counter(&self, key: &str) -> Result<()> {
        self.write_counter(key, 0).await
    }
}

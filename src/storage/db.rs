use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Handle to the durable store backing engagement counters.
///
/// Cheap to clone (pool handle); one instance is shared by everything that
/// reads or writes counters.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// Pass `":memory:"` for an ephemeral store (tests, incognito sessions).
    pub async fn open(path: &str) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?.create_if_missing(true);
        // An in-memory database is per-connection; a wider pool would see
        // empty copies.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

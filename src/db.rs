use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::info;

use crate::core::store::KeyValueStore;
use crate::error::Result;

pub async fn init(db_path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(dir) = db_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let database_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
    info!("Connecting to SQLite database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    migrate(&pool).await?;
    info!("Database initialized successfully.");
    Ok(pool)
}

/// Single-connection in-memory database (tests, throwaway sessions).
pub async fn init_memory() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    info!("Running migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn save_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP"
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(record) => Ok(Some(record.try_get("value")?)),
        None => Ok(None),
    }
}

/// All settings whose key starts with `prefix`.
pub async fn get_settings_with_prefix(pool: &SqlitePool, prefix: &str) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query("SELECT key, value FROM settings WHERE key LIKE $1")
        .bind(format!("{}%", prefix))
        .fetch_all(pool)
        .await?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        pairs.push((row.try_get("key")?, row.try_get("value")?));
    }
    Ok(pairs)
}

/// `settings` table as the durable key-value slot.
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        get_setting(&self.pool, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        save_setting(&self.pool, key, value).await
    }
}

mod models;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub type DbPool = SqlitePool;

/// Hard per-operation budget; anything slower is aborted and surfaced
/// as `StoreError::Timeout` rather than left hanging.
pub const DB_TIMEOUT: Duration = Duration::from_secs(3);

/// Failures surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database operation timed out")]
    Timeout,
    #[error("database unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Run a database future under the 3-second operation budget.
pub(crate) async fn with_timeout<T, F>(fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(DB_TIMEOUT, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout),
    }
}

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    // Strip SQL comment lines (lines starting with --) before splitting,
    // so a ';' inside a comment never becomes a bogus statement.
    let cleaned: String = sql
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    for statement in cleaned.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("libris.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;
    execute_sql(pool, include_str!("../../migrations/002_catalog.sql")).await?;

    info!("Migrations completed");
    Ok(())
}


#[cfg(test)]
pub(crate) async fn memory_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

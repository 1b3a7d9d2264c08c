use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DatabaseConfig;

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .max_lifetime(Duration::from_secs(60 * 60))
        .idle_timeout(Duration::from_secs(30 * 60))
}

/// Connect the pool and verify the database answers.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let db = pool_options(config)
        .connect(&config.url)
        .await
        .context("failed to create connection pool")?;
    ping(&db).await.context("database connection test failed")?;
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database connected"
    );
    Ok(db)
}

/// Build the pool without opening a connection; the first query connects.
pub fn connect_lazy(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    pool_options(config)
        .connect_lazy(&config.url)
        .context("invalid database url")
}

pub async fn ping(db: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(db).await?;
    Ok(())
}

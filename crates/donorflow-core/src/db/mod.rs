use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

mod donors;

pub use donors::PgDonorStore;

pub type DbPool = Pool<Postgres>;

/// Establish a new Postgres connection pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .with_context(|| "failed to connect to Postgres")?;

    tracing::info!(max_connections, "database connection pool established");
    Ok(pool)
}

/// Run database migrations embedded at compile-time.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .with_context(|| "failed to run database migrations")
}

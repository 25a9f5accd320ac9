//! Postgres pools for `postgres:` remote stores.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub type Pool = PgPool;

/// How long a sync step waits for a free connection before the adapter
/// reports a retryable failure.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool for one remote store, capped at `max_connections`.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<Pool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Bring the `state_blobs` schema up to date.
pub async fn run_migrations(pool: &Pool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

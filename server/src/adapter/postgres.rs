use async_trait::async_trait;

use super::{AdapterError, RemoteBlob, RemoteStore};
use crate::db::{self, Pool};

/// Remote store backed by a Postgres `state_blobs` table.
pub struct PgRemote {
    id: String,
    pool: Pool,
}

impl PgRemote {
    pub fn new(id: impl Into<String>, pool: Pool) -> Self {
        Self {
            id: id.into(),
            pool,
        }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(
        id: impl Into<String>,
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, AdapterError> {
        let pool = db::create_pool(database_url, max_connections)
            .await
            .map_err(classify)?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| AdapterError::Fatal(format!("migration failed: {e}")))?;
        Ok(Self::new(id, pool))
    }
}

/// Split sqlx failures into transient and permanent.
fn classify(err: sqlx::Error) -> AdapterError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AdapterError::Retryable(err.to_string()),
        other => AdapterError::Fatal(other.to_string()),
    }
}

#[async_trait]
impl RemoteStore for PgRemote {
    fn id(&self) -> &str {
        &self.id
    }

    async fn retrieve(&self, key: &str) -> Result<Option<RemoteBlob>, AdapterError> {
        let row = db::get_blob(&self.pool, key).await.map_err(classify)?;
        Ok(row.map(|row| RemoteBlob {
            blob: row.blob,
            fingerprint: row.fingerprint,
        }))
    }

    async fn store(&self, key: &str, blob: RemoteBlob) -> Result<(), AdapterError> {
        db::upsert_blob(&self.pool, key, &blob.blob, &blob.fingerprint)
            .await
            .map_err(classify)
    }
}

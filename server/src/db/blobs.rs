//! Queries against the `state_blobs` table.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// A stored blob row.
#[derive(Debug)]
pub struct StoredBlob {
    pub key: String,
    pub blob: String,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredBlob {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredBlob {
            key: row.try_get("key")?,
            blob: row.try_get("blob")?,
            fingerprint: row.try_get("fingerprint")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fetch the blob stored under `key`.
pub async fn get_blob(pool: &PgPool, key: &str) -> Result<Option<StoredBlob>, sqlx::Error> {
    sqlx::query_as::<_, StoredBlob>(
        r#"
        SELECT key, blob, fingerprint, updated_at
        FROM state_blobs
        WHERE key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Insert or replace the blob under `key`.
pub async fn upsert_blob(
    pool: &PgPool,
    key: &str,
    blob: &str,
    fingerprint: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO state_blobs (key, blob, fingerprint, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (key) DO UPDATE SET
            blob = EXCLUDED.blob,
            fingerprint = EXCLUDED.fingerprint,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(key)
    .bind(blob)
    .bind(fingerprint)
    .execute(pool)
    .await?;

    Ok(())
}

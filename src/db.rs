use std::path::{Path, PathBuf};

use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::models::Record;
use crate::storage::CollectionStore;

pub type DB = SqlitePool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    kind     TEXT    NOT NULL,
    id       TEXT    NOT NULL,
    position INTEGER NOT NULL,
    body     TEXT    NOT NULL,
    PRIMARY KEY (kind, id)
)
"#;

pub async fn open(path: &Path) -> StoreResult<DB> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    sqlx::query(SCHEMA).execute(&pool).await?;
    debug!(path = %path.display(), "sqlite store ready");
    Ok(pool)
}

/// Collections kept as JSON bodies in a single SQLite table, partitioned by
/// kind and ordered by insertion position.
pub struct SqliteStore {
    pool: DB,
    path: PathBuf,
}

impl SqliteStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let pool = open(&path).await?;
        Ok(Self { pool, path })
    }

    fn decode<R: Record>(&self, body: &str) -> StoreResult<R> {
        serde_json::from_str(body).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl CollectionStore for SqliteStore {
    async fn load_all<R: Record>(&self) -> StoreResult<Vec<R>> {
        let rows = sqlx::query("SELECT body FROM records WHERE kind = ? ORDER BY position")
            .bind(R::KIND.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| self.decode(row.get::<&str, _>("body")))
            .collect()
    }

    async fn upsert<R: Record>(&self, record: &R) -> StoreResult<()> {
        let body = serde_json::to_string(record).map_err(|source| StoreError::Encode {
            kind: R::KIND,
            source,
        })?;

        // A replaced record keeps its position; a new one goes to the end.
        sqlx::query(
            r#"
            INSERT INTO records (kind, id, position, body)
            VALUES (?1, ?2,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM records WHERE kind = ?1),
                    ?3)
            ON CONFLICT (kind, id) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(R::KIND.as_str())
        .bind(record.id())
        .bind(body)
        .execute(&self.pool)
        .await?;

        trace!(kind = %R::KIND, id = record.id(), "upsert");
        Ok(())
    }

    async fn replace_existing<R: Record>(&self, record: &R) -> StoreResult<()> {
        let body = serde_json::to_string(record).map_err(|source| StoreError::Encode {
            kind: R::KIND,
            source,
        })?;

        let res = sqlx::query("UPDATE records SET body = ? WHERE kind = ? AND id = ?")
            .bind(body)
            .bind(R::KIND.as_str())
            .bind(record.id())
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::not_found(R::KIND, record.id()));
        }

        trace!(kind = %R::KIND, id = record.id(), "replace");
        Ok(())
    }

    async fn delete_by_id<R: Record>(&self, id: &str) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM records WHERE kind = ? AND id = ?")
            .bind(R::KIND.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::not_found(R::KIND, id));
        }

        trace!(kind = %R::KIND, id, "delete");
        Ok(())
    }

    async fn find_by_id<R: Record>(&self, id: &str) -> StoreResult<R> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM records WHERE kind = ? AND id = ?")
                .bind(R::KIND.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match body {
            Some(body) => self.decode(&body),
            None => Err(StoreError::not_found(R::KIND, id)),
        }
    }
}

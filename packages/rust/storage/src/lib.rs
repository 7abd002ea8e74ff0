//! Record store gateway for Carton.
//!
//! [`RecordStore`] is the narrow fetch/store/delete interface the core talks
//! to. Records are JSON documents addressed by `(bucket, id)`.
//!
//! Two backends ship here:
//! - [`Storage`]: a libSQL database file (read-write via [`Storage::open`],
//!   read-only via [`Storage::open_readonly`])
//! - [`MemoryStore`]: a process-local map, used by tests and dry runs
//!
//! Neither backend offers compare-and-swap: two writers storing the same
//! record race, and the last `store` wins.

mod memory;
mod migrations;

use std::future::Future;
use std::path::Path;

use carton_shared::{CartonError, Result};
use chrono::Utc;
use libsql::{Connection, Database, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Fetch/store/delete of JSON records by bucket and identifier.
pub trait RecordStore: Send + Sync {
    /// Raw JSON body of `bucket/id`, or `None` when absent.
    fn fetch_raw(
        &self,
        bucket: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Insert or overwrite `bucket/id` with `body`.
    fn store_raw(&self, bucket: &str, id: &str, body: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Remove `bucket/id`. Removing an absent record is not an error.
    fn delete(&self, bucket: &str, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Ids stored in `bucket`, sorted.
    fn list_ids(&self, bucket: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetch and decode `bucket/id`; a missing record is [`CartonError::NotFound`].
    fn fetch<T: DeserializeOwned + Send>(
        &self,
        bucket: &str,
        id: &str,
    ) -> impl Future<Output = Result<T>> + Send {
        async move {
            let body = self
                .fetch_raw(bucket, id)
                .await?
                .ok_or_else(|| CartonError::not_found(bucket, id))?;
            serde_json::from_str(&body)
                .map_err(|e| CartonError::Serialization(format!("{bucket}/{id}: {e}")))
        }
    }

    /// Encode `record` as JSON and store it under `bucket/id`.
    fn store<T: Serialize + Sync>(
        &self,
        bucket: &str,
        id: &str,
        record: &T,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let body = serde_json::to_string(record)?;
            self.store_raw(bucket, id, &body).await
        }
    }
}

// ---------------------------------------------------------------------------
// libSQL backend
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CartonError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CartonError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode, for status reporting
    /// paths that only ever read records.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CartonError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CartonError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CartonError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }
}

impl RecordStore for Storage {
    async fn fetch_raw(&self, bucket: &str, id: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM records WHERE bucket = ?1 AND id = ?2",
                params![bucket, id],
            )
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| CartonError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(CartonError::Storage(e.to_string())),
        }
    }

    async fn store_raw(&self, bucket: &str, id: &str, body: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO records (bucket, id, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(bucket, id) DO UPDATE SET
                   body = excluded.body,
                   updated_at = excluded.updated_at",
                params![bucket, id, body, now.as_str()],
            )
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?;
        tracing::debug!(bucket, id, bytes = body.len(), "stored record");
        Ok(())
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM records WHERE bucket = ?1 AND id = ?2",
                params![bucket, id],
            )
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn list_ids(&self, bucket: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM records WHERE bucket = ?1 ORDER BY id",
                params![bucket],
            )
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| CartonError::Storage(e.to_string()))?
        {
            results.push(
                row.get::<String>(0)
                    .map_err(|e| CartonError::Storage(e.to_string()))?,
            );
        }
        Ok(results)
    }
}

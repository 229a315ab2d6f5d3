//! libSQL-backed index for offline runs.
//!
//! Each partition is a logical namespace inside one `documents` table; the
//! `(partition, key)` primary key gives the same create-or-replace behavior
//! as the HTTP backend.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use roomscout_shared::{Result, RoomscoutError};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::SearchIndex;
use crate::migrations;

fn index_err(e: impl std::fmt::Display) -> RoomscoutError {
    RoomscoutError::Index(e.to_string())
}

/// Local file index.
pub struct LocalIndex {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LocalIndex {
    /// Open or create the index file at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RoomscoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(index_err)?;
        let conn = db.connect().map_err(index_err)?;

        let index = Self { db, conn };
        index.run_migrations().await?;
        Ok(index)
    }

    async fn run_migrations(&self) -> Result<()> {
        let current = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    RoomscoutError::Index(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// 0 when the migrations table does not exist yet.
    async fn schema_version(&self) -> u32 {
        let Ok(mut rows) = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await
        else {
            return 0;
        };

        match rows.next().await {
            Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
            _ => 0,
        }
    }

    /// Number of documents stored in `partition`.
    pub async fn count(&self, partition: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM documents WHERE partition = ?1",
                params![partition],
            )
            .await
            .map_err(index_err)?;

        match rows.next().await.map_err(index_err)? {
            Some(row) => row.get::<i64>(0).map(|n| n as u64).map_err(index_err),
            None => Ok(0),
        }
    }

    /// Remove every stored document.
    pub async fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM documents", params![])
            .await
            .map_err(index_err)?;
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for LocalIndex {
    async fn upsert(&self, partition: &str, key: &str, document: &Value) -> Result<()> {
        let body = serde_json::to_string(document).map_err(index_err)?;
        let hash = format!("{:x}", Sha256::digest(body.as_bytes()));
        let now = Utc::now().to_rfc3339();

        // An identical body leaves the row, including `updated_at`, untouched.
        let changed = self
            .conn
            .execute(
                "INSERT INTO documents (partition, key, body, content_hash, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(partition, key) DO UPDATE SET
                    body = excluded.body,
                    content_hash = excluded.content_hash,
                    updated_at = excluded.updated_at
                 WHERE documents.content_hash <> excluded.content_hash",
                params![partition, key, body.as_str(), hash.as_str(), now.as_str()],
            )
            .await
            .map_err(index_err)?;

        if changed == 0 {
            debug!(partition, key, "document unchanged");
        } else {
            debug!(partition, key, "document stored");
        }
        Ok(())
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM documents WHERE partition = ?1 AND key = ?2",
                params![partition, key],
            )
            .await
            .map_err(index_err)?;

        let Some(row) = rows.next().await.map_err(index_err)? else {
            return Ok(None);
        };
        let body = row.get::<String>(0).map_err(index_err)?;
        serde_json::from_str(&body).map(Some).map_err(index_err)
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    async fn temp_index() -> LocalIndex {
        let path = std::env::temp_dir().join(format!("roomscout_test_{}.db", Uuid::now_v7()));
        LocalIndex::open(&path).await.expect("open local index")
    }

    #[tokio::test]
    async fn reopen_keeps_schema_version() {
        let path = std::env::temp_dir().join(format!("roomscout_test_{}.db", Uuid::now_v7()));
        drop(LocalIndex::open(&path).await.expect("first open"));
        let again = LocalIndex::open(&path).await.expect("second open");
        assert_eq!(again.schema_version().await, 1);
    }

    #[tokio::test]
    async fn upsert_twice_keeps_one_document() {
        let index = temp_index().await;
        let doc = json!({"id": "abzakovo-park", "name": "Abzakovo Park"});

        index.upsert("hotel-en", "abzakovo-park", &doc).await.unwrap();
        index.upsert("hotel-en", "abzakovo-park", &doc).await.unwrap();

        assert_eq!(index.count("hotel-en").await.unwrap(), 1);
        assert_eq!(
            index.get("hotel-en", "abzakovo-park").await.unwrap(),
            Some(doc)
        );
    }

    async fn updated_at(index: &LocalIndex, key: &str) -> String {
        let mut rows = index
            .conn
            .query(
                "SELECT updated_at FROM documents WHERE partition = 'hotel-en' AND key = ?1",
                params![key],
            )
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<String>(0).unwrap()
    }

    #[tokio::test]
    async fn identical_body_is_not_rewritten() {
        let index = temp_index().await;
        let doc = json!({"id": "a", "name": "Same"});

        index.upsert("hotel-en", "a", &doc).await.unwrap();
        let first = updated_at(&index, "a").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        index.upsert("hotel-en", "a", &doc).await.unwrap();
        assert_eq!(updated_at(&index, "a").await, first);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        index
            .upsert("hotel-en", "a", &json!({"id": "a", "name": "Changed"}))
            .await
            .unwrap();
        assert_ne!(updated_at(&index, "a").await, first);
    }

    #[tokio::test]
    async fn upsert_replaces_body() {
        let index = temp_index().await;

        index.upsert("hotel-en", "a", &json!({"name": "Old"})).await.unwrap();
        index.upsert("hotel-en", "a", &json!({"name": "New"})).await.unwrap();

        let stored = index.get("hotel-en", "a").await.unwrap().unwrap();
        assert_eq!(stored["name"], "New");
    }

    #[tokio::test]
    async fn partitions_are_separate() {
        let index = temp_index().await;

        index.upsert("hotel-en", "a", &json!({"name": "Bear"})).await.unwrap();
        index.upsert("hotel-ru", "a", &json!({"name": "Медведь"})).await.unwrap();

        assert_eq!(index.count("hotel-en").await.unwrap(), 1);
        assert_eq!(index.count("hotel-ru").await.unwrap(), 1);
        assert_eq!(
            index.get("hotel-ru", "a").await.unwrap().unwrap()["name"],
            "Медведь"
        );
        assert!(index.get("hotel-de", "a").await.unwrap().is_none());

        index.clear().await.unwrap();
        assert_eq!(index.count("hotel-en").await.unwrap(), 0);
    }
}

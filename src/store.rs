//! SQLite-backed candidate storage.
//!
//! Chunk text lives in `chunk`, embeddings in `embedding`, joined on `id`.
//! Ingestion replaces both tables inside one transaction, so readers see
//! either the previous collection or the new one.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::error::{RagError, Result};
use crate::vector_db::Candidate;

/// A chunk ready to be written, with its embedding already encoded.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub label: String,
    pub chunk_number: i64,
    pub text: String,
    pub embedding: Vec<u8>,
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn load_all_candidates(&self) -> Result<Vec<Candidate>>;

    async fn replace_all_candidates(&self, candidates: Vec<NewCandidate>) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))
            .map_err(RagError::StorageFailure)?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .context("failed to set journal_mode pragma")
            .map_err(RagError::StorageFailure)?;

        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("failed to open in-memory database")
            .map_err(RagError::StorageFailure)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunk (
                id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                chunk_number INTEGER NOT NULL,
                content TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS embedding (
                id INTEGER NOT NULL PRIMARY KEY,
                embedding BLOB NOT NULL
            );",
        )
        .context("failed to create tables")
        .map_err(RagError::StorageFailure)?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunk", [], |r| r.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow!("database connection lock poisoned"))?;
            f(&mut *conn)
        })
        .await
        .context("database task panicked")
        .and_then(|r| r)
        .map_err(RagError::StorageFailure)
    }
}

#[async_trait]
impl CandidateStore for SqliteStore {
    async fn load_all_candidates(&self) -> Result<Vec<Candidate>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chunk.id, chunk.name, chunk.content, embedding.embedding
                 FROM chunk
                 INNER JOIN embedding ON chunk.id = embedding.id
                 ORDER BY chunk.id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    text: row.get(2)?,
                    embedding: row.get(3)?,
                })
            })?;
            let candidates = rows
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to read candidate row")?;
            Ok(candidates)
        })
        .await
    }

    async fn replace_all_candidates(&self, candidates: Vec<NewCandidate>) -> Result<()> {
        let count = candidates.len();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM embedding", [])?;
            tx.execute("DELETE FROM chunk", [])?;
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'chunk'", [])?;

            {
                let mut insert_chunk = tx.prepare(
                    "INSERT INTO chunk (name, chunk_number, content) VALUES (?1, ?2, ?3)",
                )?;
                let mut insert_embedding =
                    tx.prepare("INSERT INTO embedding (id, embedding) VALUES (?1, ?2)")?;

                for candidate in &candidates {
                    insert_chunk
                        .execute(params![candidate.label, candidate.chunk_number, candidate.text])
                        .with_context(|| format!("failed to insert chunk {}", candidate.label))?;
                    let id = tx.last_insert_rowid();
                    insert_embedding
                        .execute(params![id, candidate.embedding])
                        .with_context(|| {
                            format!("failed to insert embedding for {}", candidate.label)
                        })?;
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await?;

        info!(count, "Replaced stored candidates");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use tempfile::tempdir;

    fn new_candidate(label: &str, chunk_number: i64, vector: &[f64]) -> NewCandidate {
        NewCandidate {
            label: label.to_string(),
            chunk_number,
            text: format!("{label} facts"),
            embedding: codec::encode(vector),
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() -> Result<()> {
        let store = SqliteStore::open_in_memory()?;
        assert!(store.load_all_candidates().await?.is_empty());
        assert_eq!(store.count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_then_load_preserves_order_and_blobs() -> Result<()> {
        let store = SqliteStore::open_in_memory()?;
        store
            .replace_all_candidates(vec![
                new_candidate("cat", 0, &[1.0, 0.0]),
                new_candidate("dog", 1, &[0.0, 1.0]),
            ])
            .await?;

        let loaded = store.load_all_candidates().await?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(loaded[0].label, "cat");
        assert_eq!(loaded[0].text, "cat facts");
        assert_eq!(codec::decode(&loaded[1].embedding)?.to_vec(), vec![0.0, 1.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_discards_previous_collection() -> Result<()> {
        let store = SqliteStore::open_in_memory()?;
        store
            .replace_all_candidates(vec![
                new_candidate("cat", 0, &[1.0]),
                new_candidate("dog", 1, &[2.0]),
            ])
            .await?;
        store
            .replace_all_candidates(vec![new_candidate("fish", 0, &[3.0])])
            .await?;

        let loaded = store.load_all_candidates().await?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "fish");
        assert_eq!(loaded[0].id, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_persists_across_reopen() -> Result<()> {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("main.db");

        {
            let store = SqliteStore::open(&db_path)?;
            store
                .replace_all_candidates(vec![new_candidate("owl", 0, &[0.5, 0.5])])
                .await?;
        }

        let store = SqliteStore::open(&db_path)?;
        let loaded = store.load_all_candidates().await?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "owl");
        Ok(())
    }
}

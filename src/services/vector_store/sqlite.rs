//! SQLite vector store rooted at a local directory.
//!
//! Vectors are stored as little-endian f32 blobs and scored by brute-force
//! cosine similarity, which is plenty for a single textbook.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::{CollectionInfo, CollectionMeta, VectorStore, cosine_similarity};
use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, SearchResult};

pub const DB_FILE: &str = "index.sqlite3";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL,
    embedding_model TEXT NOT NULL,
    source_checksum TEXT,
    complete INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    document_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    vector BLOB NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);
"#;

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    collection: String,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) the store under `root`.
    pub fn open(root: &Path, collection: &str) -> Result<Self, VectorStoreError> {
        std::fs::create_dir_all(root).map_err(|e| {
            VectorStoreError::ConnectionError(format!(
                "cannot create store directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let path = root.join(DB_FILE);
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
            path: Some(path),
        })
    }

    pub fn open_in_memory(collection: &str) -> Result<Self, VectorStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, VectorStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &str) -> Result<T, VectorStoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let collection = self.collection.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| {
                VectorStoreError::ConnectionError("store lock poisoned".to_string())
            })?;
            f(&mut guard, &collection)
        })
        .await
        .map_err(|e| VectorStoreError::ConnectionError(format!("store task failed: {}", e)))?
    }
}

fn stored_dimension(conn: &Connection, collection: &str) -> Result<Option<u64>, VectorStoreError> {
    let dim = conn
        .query_row(
            "SELECT dimension FROM collections WHERE name = ?1",
            params![collection],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(dim.map(|d| d as u64))
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[async_trait]
impl VectorStore for SqliteBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.with_conn(|conn, _| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(true)
        })
        .await
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        self.with_conn(|conn, collection| {
            let meta = conn
                .query_row(
                    "SELECT dimension, embedding_model, source_checksum, complete
                     FROM collections WHERE name = ?1",
                    params![collection],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((dimension, embedding_model, source_checksum, complete)) = meta else {
                return Ok(None);
            };

            let points_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;

            Ok(Some(CollectionInfo {
                points_count: points_count as u64,
                dimension: Some(dimension as u64),
                embedding_model: Some(embedding_model),
                source_checksum,
                complete,
            }))
        })
        .await
    }

    async fn create_collection(&self, meta: &CollectionMeta) -> Result<(), VectorStoreError> {
        let meta = meta.clone();
        self.with_conn(move |conn, collection| {
            conn.execute(
                "INSERT OR IGNORE INTO collections
                 (name, dimension, embedding_model, source_checksum, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    collection,
                    meta.dimension as i64,
                    meta.embedding_model,
                    meta.source_checksum,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn mark_complete(&self) -> Result<(), VectorStoreError> {
        self.with_conn(|conn, collection| {
            let updated = conn
                .execute(
                    "UPDATE collections SET complete = 1 WHERE name = ?1",
                    params![collection],
                )
                .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
            if updated == 0 {
                return Err(VectorStoreError::CollectionError(format!(
                    "collection '{}' does not exist",
                    collection
                )));
            }
            Ok(())
        })
        .await
    }

    async fn upsert_points(&self, chunks: Vec<DocumentChunk>) -> Result<(), VectorStoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        self.with_conn(move |conn, collection| {
            let dimension = stored_dimension(conn, collection)?.ok_or_else(|| {
                VectorStoreError::CollectionError(format!(
                    "collection '{}' does not exist",
                    collection
                ))
            })?;

            if let Some(bad) = chunks
                .iter()
                .find(|c| c.dense_vector.len() as u64 != dimension)
            {
                return Err(VectorStoreError::UpsertError(format!(
                    "chunk {} has {} dimensions, collection expects {}",
                    bad.id,
                    bad.dense_vector.len(),
                    dimension
                )));
            }

            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO chunks
                     (collection, id, document_id, chunk_index, content,
                      start_offset, end_offset, checksum, vector)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for chunk in &chunks {
                    stmt.execute(params![
                        collection,
                        chunk.id,
                        chunk.document_id,
                        chunk.chunk_index as i64,
                        chunk.content,
                        chunk.start_offset as i64,
                        chunk.end_offset as i64,
                        chunk.checksum,
                        encode_vector(&chunk.dense_vector),
                    ])
                    .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        self.with_conn(move |conn, collection| {
            let dimension = stored_dimension(conn, collection)?.ok_or_else(|| {
                VectorStoreError::SearchError(format!(
                    "collection '{}' does not exist",
                    collection
                ))
            })?;
            if query_vector.len() as u64 != dimension {
                return Err(VectorStoreError::SearchError(format!(
                    "query has {} dimensions, collection expects {}",
                    query_vector.len(),
                    dimension
                )));
            }

            let mut stmt = conn.prepare(
                "SELECT id, chunk_index, content, start_offset, end_offset, vector
                 FROM chunks WHERE collection = ?1",
            )?;
            let rows = stmt.query_map(params![collection], |row| {
                let vector: Vec<u8> = row.get(5)?;
                Ok(SearchResult {
                    chunk_id: row.get(0)?,
                    score: cosine_similarity(&query_vector, &decode_vector(&vector)),
                    content: row.get(2)?,
                    chunk_index: row.get::<_, i64>(1)? as u32,
                    start_offset: row.get::<_, i64>(3)? as u64,
                    end_offset: row.get::<_, i64>(4)? as u64,
                })
            })?;

            let mut results = Vec::new();
            for row in rows {
                let result = row?;
                if min_score.is_none_or(|min| result.score >= min) {
                    results.push(result);
                }
            }

            // Ties resolve by position in the document so results are stable
            results.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| a.chunk_index.cmp(&b.chunk_index))
            });
            results.truncate(limit as usize);
            Ok(results)
        })
        .await
    }

    async fn delete_collection(&self) -> Result<(), VectorStoreError> {
        self.with_conn(|conn, collection| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM chunks WHERE collection = ?1", params![collection])
                .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;
            tx.execute("DELETE FROM collections WHERE name = ?1", params![collection])
                .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

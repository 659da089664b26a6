//! SQLite-backed vector collection with brute-force cosine search
//!
//! Embeddings are stored as little-endian `f32` blobs next to the chunk
//! metadata. A rebuild swaps the whole collection inside one transaction, so
//! readers never observe a half-written index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::types::{Chunk, ChunkSource, DocumentSummary, EnrichedChunk, VectorRecord};

/// SQLite vector store holding one named collection
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

/// A chunk row as read back from the database
struct StoredChunk {
    id: String,
    document_id: String,
    text: String,
    context: String,
    filename: String,
    source: String,
    page: i64,
    chunk_index: i64,
    byte_start: i64,
    byte_end: i64,
    embedding: Vec<u8>,
}

impl SqliteVectorStore {
    /// Create or open the store at `path`, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P, collection: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::vector_db(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.into(),
        };

        store.migrate()?;
        tracing::info!(
            "Opened vector store at {} (collection: {})",
            path.display(),
            store.collection
        );
        Ok(store)
    }

    /// Open the store described by the vector database configuration
    pub fn from_config(config: &VectorDbConfig) -> Result<Self> {
        Self::open(config.database_file(), config.collection.clone())
    }

    /// Create an in-memory store
    pub fn in_memory(collection: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::vector_db(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.into(),
        };

        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
        "#,
        )
        .map_err(|e| Error::vector_db(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                filename TEXT NOT NULL,
                source TEXT NOT NULL,
                total_pages INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                ingested_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                chunk_text TEXT NOT NULL,
                context TEXT NOT NULL,
                filename TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                byte_start INTEGER NOT NULL,
                byte_end INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(collection, document_id);
        "#,
        )
        .map_err(|e| Error::vector_db(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Replace every chunk and document of the collection in one transaction
    pub fn replace_all_blocking(
        &self,
        records: &[VectorRecord],
        documents: &[DocumentSummary],
    ) -> Result<()> {
        let dimensions = records.first().map(|r| r.embedding.len()).unwrap_or(0);
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimensions) {
            return Err(Error::vector_db(format!(
                "Embedding dimension mismatch for chunk {}: expected {}, got {}",
                bad.chunk.id(),
                dimensions,
                bad.embedding.len()
            )));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM chunks WHERE collection = ?1", params![self.collection])?;
        tx.execute("DELETE FROM documents WHERE collection = ?1", params![self.collection])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO documents (
                    collection, id, filename, source, total_pages, total_chunks, ingested_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for doc in documents {
                stmt.execute(params![
                    self.collection,
                    doc.id.to_string(),
                    doc.filename,
                    doc.source,
                    doc.total_pages as i64,
                    doc.total_chunks as i64,
                    doc.ingested_at.to_rfc3339(),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (
                    collection, id, document_id, chunk_text, context, filename, source,
                    page, chunk_index, byte_start, byte_end, embedding
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for record in records {
                let chunk = record.chunk.chunk();
                stmt.execute(params![
                    self.collection,
                    chunk.id.to_string(),
                    chunk.document_id.to_string(),
                    chunk.text,
                    record.chunk.context(),
                    chunk.source.filename,
                    chunk.source.source,
                    chunk.source.page_number as i64,
                    chunk.chunk_index as i64,
                    chunk.byte_start as i64,
                    chunk.byte_end as i64,
                    encode_embedding(&record.embedding),
                ])?;
            }
        }

        tx.execute(
            r#"
            INSERT INTO collections (name, dimensions, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET dimensions = excluded.dimensions, updated_at = excluded.updated_at
            "#,
            params![self.collection, dimensions as i64, Utc::now().to_rfc3339()],
        )?;

        tx.commit()?;

        tracing::info!(
            "Replaced collection '{}' with {} chunks from {} documents",
            self.collection,
            records.len(),
            documents.len()
        );
        Ok(())
    }

    /// Brute-force cosine search over the collection
    pub fn search_blocking(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();

        let dimensions: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![self.collection],
                |row| row.get(0),
            )
            .optional()?;
        match dimensions {
            Some(d) if d as usize != query.len() && d != 0 => {
                return Err(Error::vector_db(format!(
                    "Query dimension {} does not match collection dimension {}",
                    query.len(),
                    d
                )));
            }
            _ => {}
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT id, document_id, chunk_text, context, filename, source,
                   page, chunk_index, byte_start, byte_end, embedding
            FROM chunks WHERE collection = ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![self.collection], row_to_stored_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding = decode_embedding(&row.embedding);
            let similarity = cosine_similarity(query, &embedding);
            results.push(VectorSearchResult {
                chunk: stored_to_enriched(row)?,
                similarity,
            });
        }

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);
        Ok(results)
    }

    /// Documents in the collection, ordered by file name
    pub fn documents_blocking(&self) -> Result<Vec<DocumentSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, filename, source, total_pages, total_chunks, ingested_at
            FROM documents WHERE collection = ?1 ORDER BY filename, id
            "#,
        )?;

        let rows = stmt
            .query_map(params![self.collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, filename, source, total_pages, total_chunks, ingested_at)| {
                Ok(DocumentSummary {
                    id: parse_uuid(&id)?,
                    filename,
                    source,
                    total_pages: total_pages as u32,
                    total_chunks: total_chunks as u32,
                    ingested_at: DateTime::parse_from_rfc3339(&ingested_at)
                        .map(|d| d.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .collect()
    }

    /// Number of chunks in the collection
    pub fn len_blocking(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn row_to_stored_chunk(row: &rusqlite::Row) -> rusqlite::Result<StoredChunk> {
    Ok(StoredChunk {
        id: row.get(0)?,
        document_id: row.get(1)?,
        text: row.get(2)?,
        context: row.get(3)?,
        filename: row.get(4)?,
        source: row.get(5)?,
        page: row.get(6)?,
        chunk_index: row.get(7)?,
        byte_start: row.get(8)?,
        byte_end: row.get(9)?,
        embedding: row.get(10)?,
    })
}

fn stored_to_enriched(row: StoredChunk) -> Result<EnrichedChunk> {
    let id = parse_uuid(&row.id)?;
    let chunk = Chunk {
        id,
        document_id: parse_uuid(&row.document_id)?,
        text: row.text,
        source: ChunkSource {
            filename: row.filename,
            source: row.source,
            page_number: row.page as u32,
        },
        chunk_index: row.chunk_index as u32,
        byte_start: row.byte_start as usize,
        byte_end: row.byte_end as usize,
    };
    EnrichedChunk::new(chunk, row.context)
        .ok_or_else(|| Error::vector_db(format!("Chunk {} has an empty context", id)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::vector_db(format!("Invalid id '{}': {}", s, e)))
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; 0.0 when either vector has zero norm or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[async_trait]
impl VectorStoreProvider for SqliteVectorStore {
    async fn replace_all(
        &self,
        records: Vec<VectorRecord>,
        documents: Vec<DocumentSummary>,
    ) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.replace_all_blocking(&records, &documents))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        let store = self.clone();
        let query = query_embedding.to_vec();
        tokio::task::spawn_blocking(move || store.search_blocking(&query, top_k))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn documents(&self) -> Result<Vec<DocumentSummary>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.documents_blocking())
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn len(&self) -> Result<usize> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.len_blocking())
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn health_check(&self) -> Result<bool> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn.lock();
            Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok())
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

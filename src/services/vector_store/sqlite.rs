use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CollectionInfo, VectorStore, check_dimensions};
use crate::error::StoreError;
use crate::models::{Chunk, ScoredChunk};
use crate::utils::{cosine_similarity, decode_vector, encode_vector};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    chunk_id TEXT NOT NULL,
    document_id TEXT NOT NULL,
    source TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    content TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (collection, position)
);
"#;

/// Vector store kept in a single SQLite file.
///
/// Every mutation runs in one transaction, so a crash or error mid-write
/// leaves the previous state intact. Similarity search is an exact scan over
/// the collection's vectors.
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteVectorStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;
        tracing::debug!("Opened vector store at {}", path.display());
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// File backing this store, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run blocking SQLite work off the async executor.
    async fn with_conn<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            work(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn collection_info(conn: &Connection, name: &str) -> Result<Option<CollectionInfo>, StoreError> {
    let info = conn
        .query_row(
            "SELECT c.name, c.dimension, c.created_at,
                    (SELECT COUNT(*) FROM chunks WHERE collection = c.name)
             FROM collections c WHERE c.name = ?1",
            params![name],
            |row| {
                Ok(CollectionInfo {
                    name: row.get(0)?,
                    dimension: row.get::<_, Option<i64>>(1)?.map(|d| d as usize),
                    created_at: row.get(2)?,
                    chunk_count: row.get::<_, i64>(3)? as u64,
                })
            },
        )
        .optional()?;
    Ok(info)
}

fn create_collection(tx: &Transaction<'_>, name: &str) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO collections (name, dimension, created_at) VALUES (?1, NULL, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn drop_collection(tx: &Transaction<'_>, name: &str) -> Result<(), StoreError> {
    tx.execute("DELETE FROM chunks WHERE collection = ?1", params![name])?;
    tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
    Ok(())
}

fn insert_chunks(
    tx: &Transaction<'_>,
    name: &str,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
) -> Result<(), StoreError> {
    if chunks.len() != vectors.len() {
        return Err(StoreError::LengthMismatch {
            chunks: chunks.len(),
            vectors: vectors.len(),
        });
    }
    let Some(first) = vectors.first() else {
        return Ok(());
    };

    let (dimension, next_position): (Option<i64>, i64) = tx.query_row(
        "SELECT c.dimension,
                COALESCE((SELECT MAX(position) + 1 FROM chunks WHERE collection = c.name), 0)
         FROM collections c WHERE c.name = ?1",
        params![name],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let expected = dimension.map_or(first.len(), |d| d as usize);
    if expected == 0 {
        return Err(StoreError::DimensionMismatch {
            collection: name.to_string(),
            expected: 0,
            actual: 0,
        });
    }
    check_dimensions(name, expected, vectors)?;

    if dimension.is_none() {
        tx.execute(
            "UPDATE collections SET dimension = ?1 WHERE name = ?2",
            params![expected as i64, name],
        )?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO chunks (collection, position, chunk_id, document_id, source, chunk_index,
                             start_offset, end_offset, content, dimension, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for (i, (chunk, vector)) in chunks.iter().zip(vectors).enumerate() {
        stmt.execute(params![
            name,
            next_position + i as i64,
            chunk.id,
            chunk.document_id,
            chunk.source,
            i64::from(chunk.chunk_index),
            chunk.start_offset as i64,
            chunk.end_offset as i64,
            chunk.content,
            vector.len() as i64,
            encode_vector(vector),
        ])?;
    }
    Ok(())
}

fn query_collection(
    conn: &Connection,
    name: &str,
    query: &[f32],
    k: usize,
) -> Result<Vec<ScoredChunk>, StoreError> {
    let Some(info) = collection_info(conn, name)? else {
        return Ok(Vec::new());
    };
    if k == 0 || info.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(dimension) = info.dimension
        && dimension != query.len()
    {
        return Err(StoreError::DimensionMismatch {
            collection: name.to_string(),
            expected: dimension,
            actual: query.len(),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT chunk_id, document_id, source, chunk_index, start_offset, end_offset, content,
                dimension, embedding
         FROM chunks WHERE collection = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![name], |row| {
        let chunk = Chunk {
            id: row.get(0)?,
            document_id: row.get(1)?,
            source: row.get(2)?,
            chunk_index: row.get::<_, i64>(3)? as u32,
            start_offset: row.get::<_, i64>(4)? as u64,
            end_offset: row.get::<_, i64>(5)? as u64,
            content: row.get(6)?,
        };
        let dimension = row.get::<_, i64>(7)? as usize;
        let blob: Vec<u8> = row.get(8)?;
        Ok((chunk, dimension, blob))
    })?;

    let mut scored = Vec::with_capacity(info.chunk_count as usize);
    for row in rows {
        let (chunk, dimension, blob) = row?;
        let vector = decode_vector(&blob)
            .filter(|v| v.len() == dimension && dimension == query.len())
            .ok_or_else(|| StoreError::CorruptRecord {
                collection: name.to_string(),
                reason: format!("chunk {} has a malformed vector", chunk.id),
            })?;
        let score = cosine_similarity(query, &vector);
        scored.push(ScoredChunk { chunk, score });
    }

    // Stable sort: equal scores keep ingestion order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}

fn list_names(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn health_check(&self) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(true)
        })
        .await
    }

    async fn create_or_replace_collection(&self, name: &str) -> Result<CollectionInfo, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            drop_collection(&tx, &name)?;
            create_collection(&tx, &name)?;
            let info = collection_info(&tx, &name)?;
            tx.commit()?;
            info.ok_or_else(|| missing_after_write(&name))
        })
        .await
    }

    async fn get_or_create_collection(&self, name: &str) -> Result<CollectionInfo, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            if collection_info(&tx, &name)?.is_none() {
                create_collection(&tx, &name)?;
            }
            let info = collection_info(&tx, &name)?;
            tx.commit()?;
            info.ok_or_else(|| missing_after_write(&name))
        })
        .await
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| collection_info(conn, &name))
            .await
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        self.with_conn(|conn| {
            let mut infos = Vec::new();
            for name in list_names(conn)? {
                if let Some(info) = collection_info(conn, &name)? {
                    infos.push(info);
                }
            }
            Ok(infos)
        })
        .await
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            drop_collection(&tx, &name)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn add_chunks(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            if collection_info(&tx, &name)?.is_none() {
                create_collection(&tx, &name)?;
            }
            insert_chunks(&tx, &name, &chunks, &vectors)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn fill_if_empty(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<bool, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            // Immediate: take the write lock before the emptiness check, so
            // another process cannot fill the collection in between.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            match collection_info(&tx, &name)? {
                Some(info) if !info.is_empty() => return Ok(false),
                Some(_) => {}
                None => create_collection(&tx, &name)?,
            }
            insert_chunks(&tx, &name, &chunks, &vectors)?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn replace_collection(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            drop_collection(&tx, &name)?;
            create_collection(&tx, &name)?;
            insert_chunks(&tx, &name, &chunks, &vectors)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn query_similar(
        &self,
        name: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let name = name.to_string();
        let query = query.to_vec();
        self.with_conn(move |conn| query_collection(conn, &name, &query, k))
            .await
    }
}

fn missing_after_write(name: &str) -> StoreError {
    StoreError::CorruptRecord {
        collection: name.to_string(),
        reason: "collection missing right after it was written".to_string(),
    }
}

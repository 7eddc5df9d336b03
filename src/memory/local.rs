//! Async handle to the local store.
//!
//! [`LocalStore`] owns the SQLite connection. Every operation takes the
//! connection mutex on the blocking pool, so writes to the same id are
//! serialized and the async runtime never blocks on disk I/O.

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::list::{self, ListOptions, SyncCandidate};
use super::search::{self, SearchOptions};
use super::stats::{self, StatsResponse};
use super::types::{DeleteResult, MemoryRecord, NewMemory, SearchHit, StoreResult};
use super::{forget, store};
use crate::db;

#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (or create) the database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = db::open_database(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// A fresh in-memory store.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(db::open_in_memory()?))
    }

    /// Wrap an already initialized connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        }
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .context("db task failed")?
    }

    pub async fn store(&self, new: NewMemory) -> Result<StoreResult> {
        self.with_conn(move |conn| store::store_memory(conn, new)).await
    }

    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchHit>> {
        let query = query.to_string();
        self.with_conn(move |conn| search::search_memories(conn, &query, &options))
            .await
    }

    pub async fn get_all(&self, options: ListOptions) -> Result<Vec<MemoryRecord>> {
        self.with_conn(move |conn| list::list_memories(conn, &options)).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| list::get_memory(conn, &id)).await
    }

    pub async fn get_stats(&self) -> Result<StatsResponse> {
        let now = super::now_millis();
        self.with_conn(move |conn| stats::memory_stats(conn, now)).await
    }

    pub async fn delete_memory(&self, id: &str) -> Result<DeleteResult> {
        let id = id.to_string();
        self.with_conn(move |conn| forget::delete_memory(conn, &id)).await
    }

    /// Batched lookup; ids that no longer exist are simply absent.
    pub async fn get_many(&self, ids: Vec<String>) -> Result<HashMap<String, MemoryRecord>> {
        self.with_conn(move |conn| list::get_many(conn, &ids)).await
    }

    pub async fn sync_candidates(&self, limit: usize) -> Result<Vec<SyncCandidate>> {
        self.with_conn(move |conn| list::sync_candidates(conn, limit)).await
    }

    pub async fn page_for_migration(&self, offset: usize, limit: usize) -> Result<Vec<SyncCandidate>> {
        self.with_conn(move |conn| list::page_for_migration(conn, offset, limit))
            .await
    }

    pub async fn set_embedding_if_missing(&self, id: &str, content: &str, embedding: Vec<f32>) -> Result<bool> {
        let id = id.to_string();
        let content = content.to_string();
        self.with_conn(move |conn| store::set_embedding_if_missing(conn, &id, &content, &embedding))
            .await
    }

    pub async fn mark_synced(&self, record: MemoryRecord) -> Result<bool> {
        let now = super::now_millis();
        self.with_conn(move |conn| store::mark_synced(conn, &record, now)).await
    }

    pub async fn mark_unsynced(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| store::mark_unsynced(conn, &id)).await
    }

    pub async fn queue_remote_delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        let now = super::now_millis();
        self.with_conn(move |conn| forget::queue_remote_delete(conn, &id, now)).await
    }

    pub async fn pending_remote_deletes(&self, limit: usize) -> Result<Vec<String>> {
        self.with_conn(move |conn| forget::pending_remote_deletes(conn, limit)).await
    }

    pub async fn clear_remote_delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| forget::clear_remote_delete(conn, &id)).await
    }

    pub async fn health(&self) -> Result<db::HealthReport> {
        self.with_conn(|conn| db::check_database_health(conn)).await
    }

    /// Make the cached embeddings agree with the configured model.
    ///
    /// The first call only records the model. After that, a different model
    /// drops every cached vector and marks every row unsynced, so the sync
    /// daemon re-embeds and re-uploads them all. Returns the number of
    /// vectors dropped.
    pub async fn reconcile_embedding_model(&self, model: &str) -> Result<usize> {
        let model = model.to_string();
        self.with_conn(move |conn| {
            let stored = db::migrations::get_embedding_model(conn)?;
            match stored.as_deref() {
                Some(stored) if stored == model => return Ok(0),
                None => {
                    db::migrations::set_embedding_model(conn, &model)?;
                    tracing::info!(model = %model, "embedding model recorded");
                    return Ok(0);
                }
                Some(_) => {}
            }
            let tx = conn.transaction()?;
            let cleared = store::clear_cached_embeddings(&tx)?;
            db::migrations::set_embedding_model(&tx, &model)?;
            tx.commit()?;
            tracing::warn!(
                stored = ?stored,
                configured = %model,
                cleared,
                "embedding model changed, cached vectors dropped and replica marked for re-upload"
            );
            Ok(cleared)
        })
        .await
    }
}

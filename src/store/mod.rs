//! Storage abstraction for the proposal cache.
//!
//! The [`BipStore`] trait defines every operation the API layer and the
//! background workers need, enabling pluggable backends: a JSON-file store
//! for local deployments and a SQLite store when a database is configured.
//!
//! Failure semantics: storage errors on *read* are swallowed and reported
//! as an empty cache (which triggers a refetch upstream); errors on
//! *write* propagate to the caller of `replace_all`/`patch`.

pub mod file;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::models::Bip;

/// Millisecond clock, injected so staleness logic is testable.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock implementation used in production.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Abstract storage backend for the parsed proposal collection.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_all`](BipStore::get_all) | Full collection, sorted by number ascending |
/// | [`get`](BipStore::get) | Single document by number |
/// | [`get_by_author`](BipStore::get_by_author) | Case-insensitive substring match on authors |
/// | [`replace_all`](BipStore::replace_all) | Wholesale replace + derived author index + timestamp |
/// | [`patch`](BipStore::patch) | Update one document (explanation backfill) |
/// | [`cache_age`](BipStore::cache_age) | Timestamp of the last replace, if any |
/// | [`set_cache_age`](BipStore::set_cache_age) | Explicit staleness bookkeeping |
#[async_trait]
pub trait BipStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Bip>>;

    async fn get(&self, number: u32) -> Result<Option<Bip>>;

    async fn get_by_author(&self, author: &str) -> Result<Vec<Bip>>;

    /// Replace the whole collection. The documents, the derived author
    /// index, and the cache timestamp are persisted together.
    async fn replace_all(&self, bips: Vec<Bip>) -> Result<()>;

    /// Update a single document in place, leaving the rest of the
    /// collection untouched. Fails when the document is absent.
    async fn patch(&self, bip: Bip) -> Result<()>;

    async fn cache_age(&self) -> Result<Option<i64>>;

    async fn set_cache_age(&self, timestamp_ms: i64) -> Result<()>;
}

/// True when any of the document's authors contains `query`,
/// case-insensitively.
pub fn author_matches(bip: &Bip, query: &str) -> bool {
    let query = query.to_lowercase();
    bip.authors
        .iter()
        .any(|a| a.to_lowercase().contains(&query))
}

/// Open the backend selected by configuration: SQLite when `[db]` is
/// present, the file-backed store under `cache.dir` otherwise.
pub async fn open_store(config: &Config, clock: Arc<dyn Clock>) -> Result<Arc<dyn BipStore>> {
    match &config.db {
        Some(db) => {
            let store = sqlite::SqliteStore::connect(&db.path, clock).await?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(file::FileStore::new(&config.cache.dir, clock))),
    }
}

/// Create whatever the selected backend needs on first run: the schema for
/// SQLite, the cache directory for the file store. Idempotent.
pub async fn init_store(config: &Config) -> Result<()> {
    match &config.db {
        Some(db) => {
            let store =
                sqlite::SqliteStore::connect(&db.path, Arc::new(SystemClock)).await?;
            store.close().await;
            Ok(())
        }
        None => {
            std::fs::create_dir_all(&config.cache.dir)?;
            Ok(())
        }
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

//! JSON-file [`BipStore`] backend.
//!
//! The cache directory holds three artifacts, written together during
//! `replace_all`: the full document array, the derived author array, and a
//! timestamp record. State is lazy-loaded from disk on first read and
//! memoized behind an `RwLock`; a fresh process therefore serves the last
//! persisted snapshot without refetching inside the staleness window.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Bip;
use crate::stats::build_author_index;

use super::{author_matches, BipStore, Clock};

const BIPS_FILE: &str = "bips.json";
const AUTHORS_FILE: &str = "authors.json";
const AGE_FILE: &str = "cache-age.json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheAgeRecord {
    timestamp: i64,
}

struct CacheState {
    bips: Vec<Bip>,
    age: Option<i64>,
}

/// File-backed store rooted at a cache directory.
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    state: RwLock<Option<CacheState>>,
}

impl FileStore {
    pub fn new(dir: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            clock,
            state: RwLock::new(None),
        }
    }

    /// Load-once-then-memoize. Read failures (missing directory, corrupt
    /// JSON) are swallowed and reported as an empty cache.
    fn ensure_loaded(&self) {
        {
            let state = self.state.read().unwrap();
            if state.is_some() {
                return;
            }
        }
        let loaded = self.load_from_disk();
        let mut state = self.state.write().unwrap();
        if state.is_none() {
            *state = Some(loaded);
        }
    }

    fn load_from_disk(&self) -> CacheState {
        let bips = std::fs::read_to_string(self.dir.join(BIPS_FILE))
            .ok()
            .and_then(|s| serde_json::from_str::<Vec<Bip>>(&s).ok())
            .unwrap_or_default();
        let age = std::fs::read_to_string(self.dir.join(AGE_FILE))
            .ok()
            .and_then(|s| serde_json::from_str::<CacheAgeRecord>(&s).ok())
            .map(|r| r.timestamp);
        CacheState { bips, age }
    }

    fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir: {}", self.dir.display()))?;
        let path = self.dir.join(filename);
        let json = serde_json::to_string(value)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl BipStore for FileStore {
    async fn get_all(&self) -> Result<Vec<Bip>> {
        self.ensure_loaded();
        let state = self.state.read().unwrap();
        Ok(state.as_ref().map(|s| s.bips.clone()).unwrap_or_default())
    }

    async fn get(&self, number: u32) -> Result<Option<Bip>> {
        self.ensure_loaded();
        let state = self.state.read().unwrap();
        Ok(state
            .as_ref()
            .and_then(|s| s.bips.iter().find(|b| b.number == number).cloned()))
    }

    async fn get_by_author(&self, author: &str) -> Result<Vec<Bip>> {
        self.ensure_loaded();
        let state = self.state.read().unwrap();
        Ok(state
            .as_ref()
            .map(|s| {
                s.bips
                    .iter()
                    .filter(|b| author_matches(b, author))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace_all(&self, mut bips: Vec<Bip>) -> Result<()> {
        bips.sort_by_key(|b| b.number);
        let authors = build_author_index(&bips);
        let now = self.clock.now_millis();

        // Disk first; memory is only updated once all three artifacts are
        // on disk, so a failed write leaves the served snapshot intact.
        self.write_json(BIPS_FILE, &bips)?;
        self.write_json(AUTHORS_FILE, &authors)?;
        self.write_json(AGE_FILE, &CacheAgeRecord { timestamp: now })?;

        let mut state = self.state.write().unwrap();
        *state = Some(CacheState {
            bips,
            age: Some(now),
        });
        Ok(())
    }

    async fn patch(&self, bip: Bip) -> Result<()> {
        self.ensure_loaded();

        let updated = {
            let state = self.state.read().unwrap();
            let Some(current) = state.as_ref() else {
                bail!("cache is empty, nothing to patch");
            };
            let Some(index) = current.bips.iter().position(|b| b.number == bip.number) else {
                bail!("BIP {} is not in the cache", bip.number);
            };
            let mut bips = current.bips.clone();
            bips[index] = bip;
            bips
        };

        self.write_json(BIPS_FILE, &updated)?;

        let mut state = self.state.write().unwrap();
        if let Some(current) = state.as_mut() {
            current.bips = updated;
        }
        Ok(())
    }

    async fn cache_age(&self) -> Result<Option<i64>> {
        self.ensure_loaded();
        let state = self.state.read().unwrap();
        Ok(state.as_ref().and_then(|s| s.age))
    }

    async fn set_cache_age(&self, timestamp_ms: i64) -> Result<()> {
        self.write_json(
            AGE_FILE,
            &CacheAgeRecord {
                timestamp: timestamp_ms,
            },
        )?;
        self.ensure_loaded();
        let mut state = self.state.write().unwrap();
        if let Some(current) = state.as_mut() {
            current.age = Some(timestamp_ms);
        }
        Ok(())
    }
}

//! SQLite [`BipStore`] backend, selected when `[db]` is configured.
//!
//! One row per proposal; list fields (authors, replaces, categories) are
//! JSON text columns. The cache timestamp lives in a `meta` key/value
//! table so it survives restarts alongside the documents.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::models::{Bip, BipStatus, BipType};

use super::{author_matches, ensure_parent_dir, BipStore, Clock};

const CACHE_AGE_KEY: &str = "cache_age";

pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and run the
    /// schema migrations. Idempotent.
    pub async fn connect(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        ensure_parent_dir(path)?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let store = Self { pool, clock };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bips (
                number INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                authors TEXT NOT NULL,
                status TEXT NOT NULL,
                kind TEXT NOT NULL,
                created TEXT NOT NULL,
                layer TEXT,
                abstract TEXT NOT NULL,
                content TEXT NOT NULL,
                explanation TEXT,
                source_filename TEXT NOT NULL,
                source_url TEXT NOT NULL,
                replaces TEXT NOT NULL,
                replaced_by TEXT NOT NULL,
                categories TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_bip(row: &SqliteRow) -> Bip {
    let authors: String = row.get("authors");
    let replaces: String = row.get("replaces");
    let replaced_by: String = row.get("replaced_by");
    let categories: String = row.get("categories");
    let status: String = row.get("status");
    let kind: String = row.get("kind");

    Bip {
        number: row.get::<i64, _>("number") as u32,
        title: row.get("title"),
        authors: serde_json::from_str(&authors).unwrap_or_default(),
        status: BipStatus::from_text(&status),
        kind: BipType::from_text(&kind),
        created: row.get("created"),
        layer: row.get("layer"),
        abstract_text: row.get("abstract"),
        content: row.get("content"),
        explanation: row.get("explanation"),
        source_filename: row.get("source_filename"),
        source_url: row.get("source_url"),
        replaces: serde_json::from_str(&replaces).unwrap_or_default(),
        replaced_by: serde_json::from_str(&replaced_by).unwrap_or_default(),
        categories: serde_json::from_str(&categories).unwrap_or_default(),
    }
}

async fn insert_bip(tx: &mut sqlx::SqliteConnection, bip: &Bip) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bips (number, title, authors, status, kind, created, layer, abstract,
                          content, explanation, source_filename, source_url, replaces,
                          replaced_by, categories)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(bip.number as i64)
    .bind(&bip.title)
    .bind(serde_json::to_string(&bip.authors)?)
    .bind(bip.status.to_string())
    .bind(bip.kind.to_string())
    .bind(&bip.created)
    .bind(&bip.layer)
    .bind(&bip.abstract_text)
    .bind(&bip.content)
    .bind(&bip.explanation)
    .bind(&bip.source_filename)
    .bind(&bip.source_url)
    .bind(serde_json::to_string(&bip.replaces)?)
    .bind(serde_json::to_string(&bip.replaced_by)?)
    .bind(serde_json::to_string(&bip.categories)?)
    .execute(tx)
    .await?;
    Ok(())
}

#[async_trait]
impl BipStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<Bip>> {
        match sqlx::query("SELECT * FROM bips ORDER BY number ASC")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => Ok(rows.iter().map(row_to_bip).collect()),
            Err(e) => {
                tracing::warn!("cache read failed, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn get(&self, number: u32) -> Result<Option<Bip>> {
        match sqlx::query("SELECT * FROM bips WHERE number = ?")
            .bind(number as i64)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => Ok(row.as_ref().map(row_to_bip)),
            Err(e) => {
                tracing::warn!("cache read failed, treating as empty: {}", e);
                Ok(None)
            }
        }
    }

    async fn get_by_author(&self, author: &str) -> Result<Vec<Bip>> {
        let all = self.get_all().await?;
        Ok(all
            .into_iter()
            .filter(|b| author_matches(b, author))
            .collect())
    }

    async fn replace_all(&self, mut bips: Vec<Bip>) -> Result<()> {
        bips.sort_by_key(|b| b.number);
        let now = self.clock.now_millis();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bips").execute(&mut *tx).await?;
        for bip in &bips {
            insert_bip(&mut *tx, bip).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(CACHE_AGE_KEY)
        .bind(now.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn patch(&self, bip: Bip) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE bips SET title = ?, authors = ?, status = ?, kind = ?, created = ?,
                            layer = ?, abstract = ?, content = ?, explanation = ?,
                            source_filename = ?, source_url = ?, replaces = ?,
                            replaced_by = ?, categories = ?
            WHERE number = ?
            "#,
        )
        .bind(&bip.title)
        .bind(serde_json::to_string(&bip.authors)?)
        .bind(bip.status.to_string())
        .bind(bip.kind.to_string())
        .bind(&bip.created)
        .bind(&bip.layer)
        .bind(&bip.abstract_text)
        .bind(&bip.content)
        .bind(&bip.explanation)
        .bind(&bip.source_filename)
        .bind(&bip.source_url)
        .bind(serde_json::to_string(&bip.replaces)?)
        .bind(serde_json::to_string(&bip.replaced_by)?)
        .bind(serde_json::to_string(&bip.categories)?)
        .bind(bip.number as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("BIP {} is not in the cache", bip.number);
        }
        Ok(())
    }

    async fn cache_age(&self) -> Result<Option<i64>> {
        match sqlx::query_scalar::<_, String>("SELECT value FROM meta WHERE key = ?")
            .bind(CACHE_AGE_KEY)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(value) => Ok(value.and_then(|v| v.parse::<i64>().ok())),
            Err(e) => {
                tracing::warn!("cache read failed, treating as empty: {}", e);
                Ok(None)
            }
        }
    }

    async fn set_cache_age(&self, timestamp_ms: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(CACHE_AGE_KEY)
        .bind(timestamp_ms.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedClock(AtomicI64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn sample(number: u32) -> Bip {
        Bip {
            number,
            title: format!("BIP {}", number),
            authors: vec!["Pieter Wuille".to_string()],
            status: BipStatus::Final,
            kind: BipType::StandardsTrack,
            created: "2012-02-11".to_string(),
            layer: Some("Applications".to_string()),
            abstract_text: "abstract".to_string(),
            content: "content".to_string(),
            explanation: None,
            source_filename: format!("bip-{:04}.mediawiki", number),
            source_url: String::new(),
            replaces: vec![1],
            replaced_by: vec![],
            categories: vec!["wallets".to_string(), "keys".to_string()],
        }
    }

    async fn open(dir: &Path, now: i64) -> SqliteStore {
        SqliteStore::connect(
            &dir.join("bips.sqlite"),
            Arc::new(FixedClock(AtomicI64::new(now))),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn roundtrips_documents_through_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path(), 1_000).await;

        store
            .replace_all(vec![sample(32), sample(4)])
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].number, 4);
        assert_eq!(all[1], sample(32));
        assert_eq!(store.cache_age().await.unwrap(), Some(1_000));
    }

    #[tokio::test]
    async fn patch_requires_existing_row() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path(), 0).await;
        store.replace_all(vec![sample(4)]).await.unwrap();

        let mut patched = sample(4);
        patched.explanation = Some("summary".to_string());
        store.patch(patched).await.unwrap();
        assert_eq!(
            store.get(4).await.unwrap().unwrap().explanation.as_deref(),
            Some("summary")
        );

        assert!(store.patch(sample(5)).await.is_err());
    }

    #[tokio::test]
    async fn author_filter_matches_substring() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path(), 0).await;
        store.replace_all(vec![sample(32)]).await.unwrap();

        assert_eq!(store.get_by_author("WUILLE").await.unwrap().len(), 1);
        assert!(store.get_by_author("nakamoto").await.unwrap().is_empty());
    }
}

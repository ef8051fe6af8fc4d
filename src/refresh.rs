//! Refresh pipeline orchestration.
//!
//! Coordinates the full flow: upstream listing → content fetch → parse →
//! categorize → wholesale store replace. Documents whose number cannot be
//! derived are dropped from the batch without failing the run; upstream
//! and storage-write failures abort it.

use crate::categorize::categorize;
use crate::error::RefreshError;
use crate::parse::parse_bip;
use crate::source::BipSource;
use crate::store::BipStore;

/// Counters from one refresh run.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOutcome {
    /// Files listed upstream.
    pub fetched: usize,
    /// Documents parsed and persisted.
    pub parsed: usize,
    /// Records dropped because no number could be derived.
    pub skipped: usize,
    /// Cache timestamp after the replace, in epoch milliseconds.
    pub timestamp_ms: i64,
}

/// Run one full refresh against `source`, replacing the entire cached
/// collection in `store`. The previous snapshot keeps serving until the
/// replace lands.
pub async fn run_refresh(
    source: &dyn BipSource,
    store: &dyn BipStore,
) -> Result<RefreshOutcome, RefreshError> {
    let files = source.list_documents().await?;
    let fetched = files.len();

    let mut bips = Vec::with_capacity(fetched);
    let mut skipped = 0usize;

    for file in &files {
        let raw = source.fetch_content(&file.raw_url).await?;
        match parse_bip(&raw, &file.filename, &file.raw_url) {
            Some(mut bip) => {
                bip.categories = categorize(bip.number);
                bips.push(bip);
            }
            None => skipped += 1,
        }
    }

    let parsed = bips.len();
    store.replace_all(bips).await.map_err(RefreshError::Storage)?;

    let timestamp_ms = store
        .cache_age()
        .await
        .map_err(RefreshError::Storage)?
        .unwrap_or_default();

    Ok(RefreshOutcome {
        fetched,
        parsed,
        skipped,
        timestamp_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::RemoteFile;
    use crate::store::file::FileStore;
    use crate::store::{Clock, SystemClock};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticSource {
        files: Vec<(String, String)>,
    }

    #[async_trait]
    impl BipSource for StaticSource {
        async fn list_documents(&self) -> Result<Vec<RemoteFile>, SourceError> {
            Ok(self
                .files
                .iter()
                .map(|(name, _)| RemoteFile {
                    filename: name.clone(),
                    raw_url: format!("mock://{}", name),
                })
                .collect())
        }

        async fn fetch_content(&self, url: &str) -> Result<String, SourceError> {
            let name = url.trim_start_matches("mock://");
            self.files
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, body)| body.clone())
                .ok_or_else(|| SourceError::Malformed(format!("no such file: {}", name)))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl BipSource for FailingSource {
        async fn list_documents(&self) -> Result<Vec<RemoteFile>, SourceError> {
            Err(SourceError::Status(reqwest::StatusCode::FORBIDDEN))
        }

        async fn fetch_content(&self, _url: &str) -> Result<String, SourceError> {
            Err(SourceError::Status(reqwest::StatusCode::FORBIDDEN))
        }
    }

    fn doc(title: &str) -> String {
        format!("<pre>\n  Title: {}\n  Author: A\n  Status: Draft\n</pre>\n", title)
    }

    #[tokio::test]
    async fn refresh_parses_categorizes_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path(), Arc::new(SystemClock) as Arc<dyn Clock>);
        let source = StaticSource {
            files: vec![
                ("bip-0009.mediawiki".to_string(), doc("Nine")),
                ("bip-0001.mediawiki".to_string(), doc("One")),
                ("bip-9999.mediawiki".to_string(), doc("Big")),
            ],
        };

        let outcome = run_refresh(&source, &store).await.unwrap();
        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.parsed, 3);
        assert_eq!(outcome.skipped, 0);

        let all = store.get_all().await.unwrap();
        let numbers: Vec<u32> = all.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 9, 9999]);
        for bip in &all {
            assert!(!bip.categories.is_empty());
        }
    }

    #[tokio::test]
    async fn unnumbered_records_are_dropped_silently() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path(), Arc::new(SystemClock) as Arc<dyn Clock>);
        let source = StaticSource {
            files: vec![
                ("bip-0001.mediawiki".to_string(), doc("One")),
                ("bip-notes.mediawiki".to_string(), doc("Junk")),
            ],
        };

        let outcome = run_refresh(&source, &store).await.unwrap();
        assert_eq!(outcome.parsed, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn upstream_failure_aborts_and_keeps_old_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path(), Arc::new(SystemClock) as Arc<dyn Clock>);
        let good = StaticSource {
            files: vec![("bip-0001.mediawiki".to_string(), doc("One"))],
        };
        run_refresh(&good, &store).await.unwrap();

        let err = run_refresh(&FailingSource, &store).await.unwrap_err();
        assert!(matches!(err, RefreshError::Upstream(_)));
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }
}

//! Remote source client for the upstream proposal repository.
//!
//! Lists document files through the GitHub contents API and fetches raw
//! content by URL. Every call is a single attempt; a non-success response
//! surfaces as [`SourceError`] and the caller decides how to report it.
//! There is no rate-limit backoff here.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::config::UpstreamConfig;
use crate::error::SourceError;

/// Recognized document filenames: `bip-<digits>` with a known extension.
static DOC_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^bip-\d+\.(mediawiki|md)$").unwrap());

/// One listed document file before fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub filename: String,
    pub raw_url: String,
}

/// Listing and content retrieval against the upstream repository.
///
/// A trait seam so the API layer and tests can swap in a mock and count
/// calls.
#[async_trait]
pub trait BipSource: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<RemoteFile>, SourceError>;
    async fn fetch_content(&self, url: &str) -> Result<String, SourceError>;
}

/// Entry of a GitHub `GET /repos/{owner}/{repo}/contents` response.
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

/// GitHub-backed [`BipSource`].
pub struct GithubSource {
    client: reqwest::Client,
    contents_url: String,
}

impl GithubSource {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            // GitHub rejects requests without a User-Agent.
            .user_agent(concat!("bip-explorer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            contents_url: format!(
                "{}/repos/{}/{}/contents",
                config.api_base.trim_end_matches('/'),
                config.owner,
                config.repo
            ),
        })
    }
}

#[async_trait]
impl BipSource for GithubSource {
    async fn list_documents(&self) -> Result<Vec<RemoteFile>, SourceError> {
        let response = self.client.get(&self.contents_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let entries: Vec<ContentsEntry> = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        let files = entries
            .into_iter()
            .filter(|e| e.kind == "file" && DOC_FILE_RE.is_match(&e.name))
            .filter_map(|e| {
                e.download_url.map(|url| RemoteFile {
                    filename: e.name,
                    raw_url: url,
                })
            })
            .collect();

        Ok(files)
    }

    async fn fetch_content(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_filename_filter() {
        assert!(DOC_FILE_RE.is_match("bip-0001.mediawiki"));
        assert!(DOC_FILE_RE.is_match("bip-0352.md"));
        assert!(!DOC_FILE_RE.is_match("README.mediawiki"));
        assert!(!DOC_FILE_RE.is_match("bip-0001.txt"));
        assert!(!DOC_FILE_RE.is_match("bip-0141"));
    }

    #[test]
    fn contents_url_is_built_from_config() {
        let source = GithubSource::new(&UpstreamConfig {
            api_base: "https://api.github.com/".to_string(),
            owner: "bitcoin".to_string(),
            repo: "bips".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            source.contents_url,
            "https://api.github.com/repos/bitcoin/bips/contents"
        );
    }
}

//! End-to-end API tests: the real router and file store, with a mock
//! upstream source so runs are hermetic and fetches are countable.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use bip_explorer::config::{Config, ServerConfig};
use bip_explorer::error::SourceError;
use bip_explorer::server::{build_router, AppState};
use bip_explorer::source::{BipSource, RemoteFile};
use bip_explorer::store::file::FileStore;
use bip_explorer::store::Clock;

struct MockSource {
    files: Vec<(String, String)>,
    list_calls: AtomicUsize,
}

impl MockSource {
    fn new(files: Vec<(String, String)>) -> Self {
        Self {
            files,
            list_calls: AtomicUsize::new(0),
        }
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BipSource for MockSource {
    async fn list_documents(&self) -> Result<Vec<RemoteFile>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
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

struct FakeClock(AtomicI64);

impl FakeClock {
    fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn test_config() -> Config {
    Config {
        upstream: Default::default(),
        cache: Default::default(),
        db: None,
        explain: Default::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    }
}

fn mediawiki_doc(title: &str, author: &str, extra: &str) -> String {
    format!(
        "<pre>\n  Title: {title}\n  Author: {author}\n  Status: Final\n  Type: Standards Track\n{extra}</pre>\n\n==Abstract==\n\nAbout {title}.\n\n==Motivation==\n\nText.\n"
    )
}

struct Harness {
    state: AppState,
    source: Arc<MockSource>,
    clock: Arc<FakeClock>,
    _tmp: tempfile::TempDir,
}

fn harness(files: Vec<(String, String)>) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock(AtomicI64::new(0)));
    let source = Arc::new(MockSource::new(files));
    let store = Arc::new(FileStore::new(
        tmp.path(),
        clock.clone() as Arc<dyn Clock>,
    ));

    let state = AppState {
        config: Arc::new(test_config()),
        store,
        source: source.clone(),
        clock: clock.clone(),
    };

    Harness {
        state,
        source,
        clock,
        _tmp: tmp,
    }
}

async fn request(
    state: &AppState,
    method: &str,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let response = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn three_docs() -> Vec<(String, String)> {
    vec![
        (
            "bip-0009.mediawiki".to_string(),
            mediawiki_doc("Version bits", "Pieter Wuille", ""),
        ),
        (
            "bip-0001.mediawiki".to_string(),
            mediawiki_doc("BIP Purpose and Guidelines", "Amir Taaki", ""),
        ),
        (
            "bip-0141.mediawiki".to_string(),
            mediawiki_doc(
                "Segregated Witness",
                "Eric Lombrozo, Pieter Wuille",
                "  Superseded-By: 1000\n",
            ),
        ),
    ]
}

#[tokio::test]
async fn refresh_reports_count_and_bips_serve_sorted() {
    let h = harness(three_docs());

    let (status, json) = request(&h.state, "POST", "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert!(json["timestamp"].is_i64());

    let (status, json) = request(&h.state, "GET", "/api/bips").await;
    assert_eq!(status, StatusCode::OK);
    let numbers: Vec<u64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 9, 141]);
}

#[tokio::test]
async fn bips_within_staleness_window_fetch_upstream_once() {
    let h = harness(three_docs());

    let (status, _) = request(&h.state, "GET", "/api/bips").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&h.state, "GET", "/api/bips").await;
    assert_eq!(status, StatusCode::OK);

    // The first call found an empty cache and refreshed; the second
    // served from the cache.
    assert_eq!(h.source.list_calls(), 1);
}

#[tokio::test]
async fn expired_window_triggers_a_second_fetch() {
    let h = harness(three_docs());

    request(&h.state, "GET", "/api/bips").await;
    h.clock.advance(h.state.config.cache.ttl_ms + 1);
    request(&h.state, "GET", "/api/bips").await;

    assert_eq!(h.source.list_calls(), 2);
}

#[tokio::test]
async fn refresh_endpoint_ignores_freshness() {
    let h = harness(three_docs());

    request(&h.state, "POST", "/api/refresh").await;
    request(&h.state, "POST", "/api/refresh").await;

    assert_eq!(h.source.list_calls(), 2);
}

#[tokio::test]
async fn single_document_and_not_found() {
    let h = harness(three_docs());
    request(&h.state, "POST", "/api/refresh").await;

    let (status, json) = request(&h.state, "GET", "/api/bips/141").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Segregated Witness");
    assert_eq!(json["authors"][1], "Pieter Wuille");
    assert_eq!(json["status"], "Final");

    let (status, json) = request(&h.state, "GET", "/api/bips/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "BIP 9999 not found");
}

#[tokio::test]
async fn authors_are_sorted_by_document_count() {
    let h = harness(three_docs());
    request(&h.state, "POST", "/api/refresh").await;

    let (status, json) = request(&h.state, "GET", "/api/authors").await;
    assert_eq!(status, StatusCode::OK);
    let authors = json.as_array().unwrap();
    assert_eq!(authors[0]["name"], "Pieter Wuille");
    assert_eq!(authors[0]["bipCount"], 2);

    let (status, json) = request(&h.state, "GET", "/api/authors/wuille/bips").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stats_reflect_the_collection() {
    let h = harness(three_docs());

    // Freshness check is forced, so a cold cache still yields stats.
    let (status, json) = request(&h.state, "GET", "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalBips"], 3);
    assert_eq!(json["finalBips"], 3);
    assert_eq!(json["contributors"], 3);
}

#[tokio::test]
async fn categories_index_covers_served_tags() {
    let h = harness(three_docs());
    request(&h.state, "POST", "/api/refresh").await;

    let (status, json) = request(&h.state, "GET", "/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    // BIP 1 carries the curated governance tag.
    assert!(names.contains(&"governance"));
}

#[tokio::test]
async fn dependency_graph_keeps_dangling_replacement_edges() {
    let h = harness(three_docs());
    request(&h.state, "POST", "/api/refresh").await;

    let (status, json) = request(&h.state, "GET", "/api/dependencies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["nodeCount"], 3);

    // BIP 141 lists a successor that does not exist; the edge survives.
    let edges = json["edges"].as_array().unwrap();
    assert!(edges.iter().any(|e| {
        e["source"] == 141 && e["target"] == 1000 && e["type"] == "replaces"
    }));
}

#[tokio::test]
async fn upstream_failure_maps_to_500() {
    struct DownSource;

    #[async_trait]
    impl BipSource for DownSource {
        async fn list_documents(&self) -> Result<Vec<RemoteFile>, SourceError> {
            Err(SourceError::Malformed("boom".to_string()))
        }
        async fn fetch_content(&self, _url: &str) -> Result<String, SourceError> {
            Err(SourceError::Malformed("boom".to_string()))
        }
    }

    let mut h = harness(Vec::new());
    h.state.source = Arc::new(DownSource);

    let (status, json) = request(&h.state, "POST", "/api/refresh").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["message"].as_str().unwrap().contains("failed to load"));
}

#[tokio::test]
async fn health_reports_version() {
    let h = harness(Vec::new());
    let (status, json) = request(&h.state, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

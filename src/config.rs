use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Optional database backend. When present, the SQLite store is used;
    /// when absent, the file-backed store under `cache.dir` is the fallback.
    #[serde(default)]
    pub db: Option<DbConfig>,
    #[serde(default)]
    pub explain: ExplainConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: default_owner(),
            repo: default_repo(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_owner() -> String {
    "bitcoin".to_string()
}
fn default_repo() -> String {
    "bips".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Staleness window: the full collection is refetched once the cached
    /// snapshot is older than this.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
    /// Interval of the background refresher, slightly inside the staleness
    /// window so steady-state reads rarely pay for a refetch.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_ms: default_ttl_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/cache")
}
fn default_ttl_ms() -> i64 {
    15 * 60 * 1000
}
fn default_refresh_interval_ms() -> u64 {
    14 * 60 * 1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplainConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Documents processed per background sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between completion calls within a batch.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            batch_size: default_batch_size(),
            delay_ms: default_delay_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    5
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_sweep_interval_ms() -> u64 {
    60_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl ExplainConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate cache
    if config.cache.ttl_ms <= 0 {
        anyhow::bail!("cache.ttl_ms must be > 0");
    }
    if config.cache.refresh_interval_ms == 0 {
        anyhow::bail!("cache.refresh_interval_ms must be > 0");
    }

    // Validate explain
    if config.explain.batch_size == 0 {
        anyhow::bail!("explain.batch_size must be >= 1");
    }
    if config.explain.is_enabled() && config.explain.model.is_none() {
        anyhow::bail!(
            "explain.model must be specified when provider is '{}'",
            config.explain.provider
        );
    }
    match config.explain.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown explain provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}

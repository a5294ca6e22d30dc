//! Configuration loading for the bioscience CLI.
//! Reads bioscience.toml from the current directory, the path in
//! BIOSCIENCE_CONFIG, or the path given with --config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bioscience_client::{QueryPolicies, QueryPolicy, RetryPolicy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Serve requests from the bundled sample dataset.
    #[serde(default)]
    pub offline: bool,
}

fn default_base_url()     -> String { bioscience_client::DEFAULT_BASE_URL.to_string() }
fn default_timeout_secs() -> u64    { 30 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_secs: default_timeout_secs(), offline: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_publications_stale")]
    pub publications_stale_secs: u64,
    #[serde(default = "default_stats_stale")]
    pub stats_stale_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_publications_stale() -> u64   { 5 * 60 }
fn default_stats_stale()        -> u64   { 10 * 60 }
fn default_max_entries()        -> usize { 256 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            publications_stale_secs: default_publications_stale(),
            stats_stale_secs: default_stats_stale(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_health_retries")]
    pub retries: u32,
}

fn default_health_interval() -> u64 { 30 }
fn default_health_retries()  -> u32 { 3 }

impl Default for HealthConfig {
    fn default() -> Self {
        Self { interval_secs: default_health_interval(), retries: default_health_retries() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 { 300 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

mod tests;

impl Config {
    /// Load configuration from bioscience.toml.
    /// An explicit path wins over BIOSCIENCE_CONFIG, which wins over the
    /// current directory. A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => std::env::var("BIOSCIENCE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("bioscience.toml")),
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?
        } else {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        if let Ok(url) = std::env::var("BIOSCIENCE_API_URL") {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.health.interval_secs == 0 {
            anyhow::bail!("health.interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    pub fn policies(&self) -> QueryPolicies {
        let publications = QueryPolicy {
            stale_time: Duration::from_secs(self.cache.publications_stale_secs),
            ..QueryPolicy::publications()
        };
        QueryPolicies {
            health: QueryPolicy {
                retry: RetryPolicy::with_retries(self.health.retries).retry_all_errors(),
                refetch_interval: Some(Duration::from_secs(self.health.interval_secs)),
                ..QueryPolicy::health()
            },
            publication: publications.clone(),
            publications,
            publication_stats: QueryPolicy {
                stale_time: Duration::from_secs(self.cache.stats_stale_secs),
                ..QueryPolicy::publication_stats()
            },
        }
    }
}

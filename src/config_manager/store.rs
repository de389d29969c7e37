use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which store backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Mongo,
    Memory,
}

/// Configuration for the MongoDB backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    pub uri: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_app_name")]
    pub app_name: String,
}

fn default_database() -> String {
    "Diseases".to_string()
}

fn default_app_name() -> String {
    "vet-lookup".to_string()
}

/// Configuration for the in-memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl MemoryConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

/// Startup connection retry policy.
///
/// `delay = min(initial_delay_ms * 2^attempt, max_delay_ms)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectionPolicy {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    5
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl ReconnectionPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Store configuration: the selected backend plus its section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreKind,

    #[serde(default)]
    pub mongo: Option<MongoConfig>,

    #[serde(default)]
    pub memory: Option<MemoryConfig>,

    #[serde(default)]
    pub reconnect: ReconnectionPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreKind::Memory,
            mongo: None,
            memory: Some(MemoryConfig::default()),
            reconnect: ReconnectionPolicy::default(),
        }
    }
}

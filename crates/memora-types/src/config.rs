//! Runtime configuration types.
//!
//! `RuntimeConfig` represents `config.toml` in the data directory. Every
//! field has a default so an empty or missing file is valid.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default snapshot TTL when a definition does not set one (24 hours).
pub const DEFAULT_TTL_SECONDS: u64 = 86_400;

/// Longest TTL a snapshot can carry (100 years).
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 86_400;

/// How the definition registry decides whether a cached bundle is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Re-fingerprint the definition directory on every load.
    #[default]
    Watch,
    /// Trust the first load for the lifetime of the process.
    Memory,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Watch => write!(f, "watch"),
            CacheMode::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "watch" => Ok(CacheMode::Watch),
            "memory" => Ok(CacheMode::Memory),
            other => Err(format!("invalid definition cache mode: '{other}'")),
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Top-level configuration for the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Root of the agent definition tree. Relative to the data dir when unset.
    #[serde(default)]
    pub definitions_dir: Option<PathBuf>,

    #[serde(default)]
    pub definition_cache_mode: CacheMode,

    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_TTL_SECONDS
}

fn default_sweep_interval_seconds() -> u64 {
    3_600
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            definitions_dir: None,
            definition_cache_mode: CacheMode::default(),
            default_ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            llm: LlmConfig::default(),
        }
    }
}

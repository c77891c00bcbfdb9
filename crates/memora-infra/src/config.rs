//! Runtime configuration loader.
//!
//! Reads `config.toml` from the data directory into [`RuntimeConfig`],
//! falling back to defaults when the file is missing or malformed, then
//! applies environment overrides.

use std::path::{Path, PathBuf};

use memora_types::config::{CacheMode, MAX_TTL_SECONDS, RuntimeConfig};

/// Load `{data_dir}/config.toml` and apply process environment overrides.
pub async fn load_runtime_config(data_dir: &Path) -> RuntimeConfig {
    let config = clamp_ttl(read_config_file(data_dir).await);
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Cap `default_ttl_seconds` so every configured expiry is a valid instant.
fn clamp_ttl(mut config: RuntimeConfig) -> RuntimeConfig {
    if config.default_ttl_seconds > MAX_TTL_SECONDS {
        tracing::warn!(
            configured = config.default_ttl_seconds,
            max = MAX_TTL_SECONDS,
            "default_ttl_seconds too large, clamping"
        );
        config.default_ttl_seconds = MAX_TTL_SECONDS;
    }
    config
}

async fn read_config_file(data_dir: &Path) -> RuntimeConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RuntimeConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RuntimeConfig::default();
        }
    };

    match toml::from_str::<RuntimeConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            RuntimeConfig::default()
        }
    }
}

/// Apply `MEMORA_ENV` and `MEMORA_DEFINITION_CACHE_MODE`.
///
/// Production defaults to the memory cache mode; an explicit, valid cache
/// mode variable wins over both the file and the environment default.
pub fn apply_env_overrides(
    mut config: RuntimeConfig,
    var: impl Fn(&str) -> Option<String>,
) -> RuntimeConfig {
    if var("MEMORA_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production")) {
        config.definition_cache_mode = CacheMode::Memory;
    }
    if let Some(raw) = var("MEMORA_DEFINITION_CACHE_MODE") {
        match raw.parse::<CacheMode>() {
            Ok(mode) => config.definition_cache_mode = mode,
            Err(err) => tracing::warn!("{err}, ignoring MEMORA_DEFINITION_CACHE_MODE"),
        }
    }
    config
}

/// The definitions root: the configured path, or `{data_dir}/definitions`.
pub fn definitions_dir(config: &RuntimeConfig, data_dir: &Path) -> PathBuf {
    match &config.definitions_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => data_dir.join(dir),
        None => data_dir.join("definitions"),
    }
}

/// Where the JSON entity sources live.
pub fn entities_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("entities")
}

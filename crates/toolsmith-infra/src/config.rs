//! Global configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.toolsmith/` by default,
//! overridable via `TOOLSMITH_DATA_DIR`) and deserializes it into
//! [`GlobalConfig`]. Falls back to defaults when the file is missing or
//! malformed. The provider API key may also come from the
//! `TOOLSMITH_API_KEY` environment variable.

use std::path::{Path, PathBuf};

use toolsmith_types::config::GlobalConfig;

/// Resolve the data directory.
///
/// Priority: `TOOLSMITH_DATA_DIR` env var, then `~/.toolsmith`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOOLSMITH_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolsmith")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Resolve the provider API key.
///
/// Priority: `config.toml` (`provider.api_key`), then the
/// `TOOLSMITH_API_KEY` environment variable. `None` means the service runs
/// with scripted agents instead of a live provider.
pub fn resolve_api_key(config: &GlobalConfig) -> Option<String> {
    config
        .provider
        .api_key
        .clone()
        .or_else(|| std::env::var("TOOLSMITH_API_KEY").ok())
        .filter(|key| !key.is_empty())
}

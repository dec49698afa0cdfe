use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::ClientConfig;

/// Environment variable overriding `backend.base_url`
pub const ENV_API_URL: &str = "SB_API_URL";
/// Environment variable overriding `backend.session_cookie`
pub const ENV_SESSION: &str = "SB_SESSION";

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Get the config file path, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"));
    config_dir.join("studyboard").join("config.toml")
}

/// Get the user's home directory
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read the config from a specific path. A missing file yields the defaults.
pub fn read_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// The explicit config path if given, otherwise the default location
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(config_path)
}

/// Read the config (explicit path or the default location) and apply
/// environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config = read_config_from(&resolve_path(explicit))?;
    Ok(apply_overrides(config, |key| std::env::var(key).ok()))
}

/// Overlay values from `lookup` (normally the process environment).
/// Empty values are ignored.
pub fn apply_overrides<F>(mut config: ClientConfig, lookup: F) -> ClientConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.backend.base_url = url;
    }
    if let Some(session) = lookup(ENV_SESSION).filter(|v| !v.trim().is_empty()) {
        config.backend.session_cookie = Some(session);
    }
    config
}

/// Write the config to a specific path, creating parent directories.
pub fn write_config_to(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

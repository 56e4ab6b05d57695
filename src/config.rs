//! Loading [`SearchConfig`] from a TOML file.
//!
//! The file holds the search options at the top level. Missing fields fall
//! back to the library defaults, so an empty file is a valid config:
//!
//! ```toml
//! providers = ["Brave", "DuckDuckGo"]
//! timeout_ms = 5000
//! max_content_length = 4000
//! ```

use std::path::{Path, PathBuf};

use websift_search::SearchConfig;

use crate::error::{HostError, Result};

/// Parse and validate a config file.
///
/// # Errors
///
/// Returns [`HostError::ReadConfig`] if the file cannot be read and
/// [`HostError::Config`] if it does not parse or fails validation.
pub fn from_file(path: &Path) -> Result<SearchConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| HostError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SearchConfig = toml::from_str(&content).map_err(|e| HostError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.validate().map_err(|e| HostError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(config)
}

/// Resolve the configuration for a run.
///
/// An explicit path must exist. Without one the default location is used
/// when present, otherwise the library defaults apply.
///
/// # Errors
///
/// See [`from_file`].
pub fn load(explicit: Option<&Path>) -> Result<SearchConfig> {
    if let Some(path) = explicit {
        return from_file(path);
    }
    let path = default_config_path();
    if path.is_file() {
        tracing::debug!(path = %path.display(), "loading default config");
        from_file(&path)
    } else {
        Ok(SearchConfig::default())
    }
}

/// Returns the default config file path: `~/.config/websift/config.toml`.
///
/// `XDG_CONFIG_HOME` takes precedence over the platform config directory.
pub fn default_config_path() -> PathBuf {
    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(config).join("websift").join("config.toml");
    }
    dirs::config_dir()
        .map(|d| d.join("websift").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/tmp/websift-config/config.toml"))
}

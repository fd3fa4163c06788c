//! Configuration file loader and environment overrides.

use std::path::{Path, PathBuf};

use crate::watcher::parse_timestamp;

use super::WatchConfig;

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".codex-session-watch.toml";

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .codex-session-watch.toml
        search_paths.push(PathBuf::from(LOCAL_CONFIG_FILE));

        // 2. User config directory: ~/.config/codex-session-watch/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("codex-session-watch").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(&self) -> Result<WatchConfig, ConfigError> {
        for path in &self.search_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Self::load_from_path(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(WatchConfig::default())
    }

    /// Load the file configuration, then apply overrides from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load_with_env(&self) -> Result<WatchConfig, ConfigError> {
        let mut config = self.load()?;
        apply_env(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<WatchConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `CODEX_HOME` and `CODEX_TTS_*` overrides using `lookup`.
///
/// Empty values are ignored. Values that fail to parse are logged and the
/// existing setting is kept.
pub fn apply_env<F>(config: &mut WatchConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("CODEX_HOME") {
        config.codex_home = PathBuf::from(v);
    }
    if let Some(v) = get("CODEX_TTS_ANNOUNCER") {
        config.announcer = Some(PathBuf::from(v));
    }
    if let Some(v) = get("CODEX_TTS_MAX_FILES") {
        set_parsed(&mut config.max_files, "CODEX_TTS_MAX_FILES", &v);
    }
    if let Some(v) = get("CODEX_TTS_DEBUG") {
        config.debug = v == "1";
    }
    if let Some(v) = get("CODEX_TTS_LOG_FILE") {
        config.log_file = PathBuf::from(v);
    }
    if let Some(v) = get("CODEX_TTS_DRY_RUN") {
        config.dry_run = v == "1";
    }
    if let Some(v) = get("CODEX_TTS_MAX_PER_HOUR") {
        set_parsed(&mut config.max_per_hour, "CODEX_TTS_MAX_PER_HOUR", &v);
    }
    if let Some(v) = get("CODEX_TTS_MIN_SECONDS_BETWEEN") {
        set_parsed(
            &mut config.min_seconds_between,
            "CODEX_TTS_MIN_SECONDS_BETWEEN",
            &v,
        );
    }
    if let Some(v) = get("CODEX_TTS_LOCK_FILE") {
        config.lock_file = PathBuf::from(v);
    }
    if let Some(v) = get("CODEX_TTS_RATE_STATE_FILE") {
        config.rate_state_file = PathBuf::from(v);
    }
    if let Some(v) = get("CODEX_TTS_BASE_DIR") {
        config.base_dir = Some(PathBuf::from(v));
    }

    let epoch = get("CODEX_TTS_START_EPOCH").and_then(|v| match v.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() => Some(secs),
        _ => {
            tracing::warn!(key = "CODEX_TTS_START_EPOCH", value = %v, "Ignoring invalid start epoch");
            None
        }
    });
    let start = epoch.or_else(|| {
        get("CODEX_TTS_START_ISO").and_then(|v| {
            let parsed = parse_timestamp(&v);
            if parsed.is_none() {
                tracing::warn!(key = "CODEX_TTS_START_ISO", value = %v, "Ignoring invalid start timestamp");
            }
            parsed
        })
    });
    if start.is_some() {
        config.start_at = start;
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!(key, value, "Ignoring unparsable environment value"),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

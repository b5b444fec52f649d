use crate::errors::{PlaygroundError, PlaygroundResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "ollama-playground";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:11434/api";
pub const DEFAULT_MODEL_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_LOG_LEVEL: &str = "warn";
const HISTORY_DIR_NAME: &str = "conversation_histories";

pub const ENV_API_URL: &str = "PLAYGROUND_API_URL";
pub const ENV_HISTORY_DIR: &str = "PLAYGROUND_HISTORY_DIR";
pub const ENV_MODEL: &str = "PLAYGROUND_MODEL";

/// Configuration struct for the playground
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PlaygroundConfig {
    pub api_base_url: Option<String>,
    pub default_model: Option<String>,
    pub history_dir: Option<PathBuf>,
    pub model_cache_ttl_secs: Option<u64>,
    pub log_level: Option<String>,
    /// When set, every assistant turn is saved under this session id
    pub autosave_session: Option<String>,
}

impl PlaygroundConfig {
    /// Built-in defaults. `history_dir` stays unset and is resolved lazily by `history_dir()`.
    pub fn defaults() -> Self {
        Self {
            api_base_url: Some(DEFAULT_API_BASE_URL.to_string()),
            default_model: None,
            history_dir: None,
            model_cache_ttl_secs: Some(DEFAULT_MODEL_CACHE_TTL_SECS),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            autosave_session: None,
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns an empty config
    pub fn load_from_file(path: &Path) -> PlaygroundResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PlaygroundError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            PlaygroundError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Reads the `PLAYGROUND_*` overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_base_url: non_empty(ENV_API_URL),
            default_model: non_empty(ENV_MODEL),
            history_dir: non_empty(ENV_HISTORY_DIR).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_base_url: other
                .api_base_url
                .clone()
                .or_else(|| self.api_base_url.clone()),
            default_model: other
                .default_model
                .clone()
                .or_else(|| self.default_model.clone()),
            history_dir: other
                .history_dir
                .clone()
                .or_else(|| self.history_dir.clone()),
            model_cache_ttl_secs: other.model_cache_ttl_secs.or(self.model_cache_ttl_secs),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            autosave_session: other
                .autosave_session
                .clone()
                .or_else(|| self.autosave_session.clone()),
        }
    }

    /// Layers defaults < config file < environment. Command-line overrides are merged by the caller.
    pub fn load_layered(path: &Path) -> PlaygroundResult<Self> {
        let file = Self::load_from_file(path)?;
        Ok(Self::defaults().merge(&file).merge(&Self::from_env()))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn model_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.model_cache_ttl_secs
                .unwrap_or(DEFAULT_MODEL_CACHE_TTL_SECS),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Directory holding one `<session_id>.json` per session
    pub fn history_dir(&self) -> PlaygroundResult<PathBuf> {
        match &self.history_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_default_config_dir(APP_NAME)?.join(HISTORY_DIR_NAME)),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> PlaygroundResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        PlaygroundError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> PlaygroundResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_empty_config() {
        let dir = tempdir().unwrap();
        let config = PlaygroundConfig::load_from_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, PlaygroundConfig::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
api_base_url = "http://gpu-box:11434/api"
default_model = "llama3"
history_dir = "/tmp/histories"
model_cache_ttl_secs = 60
"#,
        )
        .unwrap();

        let config = PlaygroundConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api_base_url(), "http://gpu-box:11434/api");
        assert_eq!(config.default_model.as_deref(), Some("llama3"));
        assert_eq!(config.history_dir, Some(PathBuf::from("/tmp/histories")));
        assert_eq!(config.model_cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.log_level, None);
        assert_eq!(config.autosave_session, None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_base_url = [").unwrap();
        let err = PlaygroundConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, PlaygroundError::ConfigError(_)));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = PlaygroundConfig::defaults();
        let file = PlaygroundConfig {
            default_model: Some("mistral".to_string()),
            model_cache_ttl_secs: Some(10),
            ..PlaygroundConfig::default()
        };
        let merged = base.merge(&file);
        assert_eq!(merged.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(merged.default_model.as_deref(), Some("mistral"));
        assert_eq!(merged.model_cache_ttl(), Duration::from_secs(10));
        assert_eq!(merged.log_level(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_env_lookup_skips_blank_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_URL, "http://other:11434/api"),
            (ENV_MODEL, "  "),
            (ENV_HISTORY_DIR, "/data/chats"),
        ]
        .into_iter()
        .collect();
        let config = PlaygroundConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_base_url.as_deref(), Some("http://other:11434/api"));
        assert_eq!(config.default_model, None);
        assert_eq!(config.history_dir, Some(PathBuf::from("/data/chats")));
    }

    #[test]
    fn test_explicit_history_dir_wins() {
        let config = PlaygroundConfig {
            history_dir: Some(PathBuf::from("conversation_histories")),
            ..PlaygroundConfig::defaults()
        };
        assert_eq!(
            config.history_dir().unwrap(),
            PathBuf::from("conversation_histories")
        );
    }
}

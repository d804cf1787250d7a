//! Fridge Chef Configuration
//!
//! Provider selection and model-boundary settings.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (`--provider`, `--model`)
//! 2. Environment variables (`FRIDGE_CHEF_*`, `OPENAI_API_KEY`, `.env` included)
//! 3. Config file (`fridge-chef.yaml` in the working directory, or `--config`)
//! 4. Defaults

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChefError, Result};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "fridge-chef.yaml";

pub const ENV_PROVIDER: &str = "FRIDGE_CHEF_PROVIDER";
pub const ENV_MODEL: &str = "FRIDGE_CHEF_MODEL";
pub const ENV_BASE_URL: &str = "FRIDGE_CHEF_BASE_URL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "FRIDGE_CHEF_TIMEOUT_SECS";
pub const ENV_MAX_TOOL_ROUNDS: &str = "FRIDGE_CHEF_MAX_TOOL_ROUNDS";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChefConfig {
    /// Provider name (openai, ollama, mock)
    pub provider: String,

    /// Model override; each provider has its own default
    pub model: Option<String>,

    /// Endpoint override for OpenAI-compatible servers or a remote Ollama
    pub base_url: Option<String>,

    /// OpenAI API key (sk-...)
    pub api_key: Option<String>,

    /// HTTP request timeout
    pub timeout_secs: u64,

    /// Tool rounds HTTP providers allow before forcing a final answer
    pub max_tool_rounds: u32,
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: 60,
            max_tool_rounds: 8,
        }
    }
}

impl ChefConfig {
    /// Load from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ChefError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ChefError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Resolve the effective configuration
    ///
    /// An explicit `path` must exist; otherwise `fridge-chef.yaml` is used
    /// when present. Environment variables are applied on top and the result
    /// is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        let config = config.with_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables read through `lookup`
    ///
    /// Empty values are ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get(ENV_PROVIDER) {
            self.provider = provider;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.model = Some(model);
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            self.timeout_secs = parse_number(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_TOOL_ROUNDS) {
            self.max_tool_rounds = parse_number(ENV_MAX_TOOL_ROUNDS, &raw)?;
        }

        Ok(self)
    }

    /// Apply CLI overrides
    pub fn with_overrides(mut self, provider: Option<String>, model: Option<String>) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }
        if model.is_some() {
            self.model = model;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ChefError::ConfigError {
                reason: "timeout_secs must be greater than 0".to_string(),
            });
        }

        if let Some(base_url) = &self.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| ChefError::ConfigError {
                reason: format!("Invalid base_url '{}': {}", base_url, e),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ChefError::ConfigError {
                    reason: format!("base_url must use http or https, got '{}'", parsed.scheme()),
                });
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| ChefError::ConfigError {
        reason: format!("{} must be a non-negative integer, got '{}'", key, raw),
    })
}

/// Mask an API key for display
///
/// Shows first N chars + asterisks, e.g. "sk-proj-***"
pub fn mask_api_key(key: &str, visible_chars: usize) -> String {
    if key.is_empty() {
        return String::new();
    }

    let visible = key
        .char_indices()
        .nth(visible_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(key.len());
    format!("{}***", &key[..visible])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ChefConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_tool_rounds, 8);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = ChefConfig::from_yaml("provider: ollama\nmodel: qwen2.5\n").unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model.as_deref(), Some("qwen2.5"));
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_from_yaml_rejects_unknown_keys() {
        let err = ChefConfig::from_yaml("provder: mock\n").unwrap_err();
        assert!(matches!(err, ChefError::ConfigError { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "provider: mock\nmax_tool_rounds: 2").unwrap();

        let config = ChefConfig::from_file(file.path()).unwrap();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.max_tool_rounds, 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ChefConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ChefConfig::from_yaml("provider: ollama\ntimeout_secs: 5\n")
            .unwrap()
            .with_env_from(env(&[
                (ENV_PROVIDER, "mock"),
                (ENV_TIMEOUT_SECS, "30"),
                (ENV_API_KEY, "sk-test"),
                (ENV_MODEL, ""),
            ]))
            .unwrap();

        assert_eq!(config.provider, "mock");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_env_bad_number() {
        let err = ChefConfig::default()
            .with_env_from(env(&[(ENV_MAX_TOOL_ROUNDS, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_TOOL_ROUNDS));
    }

    #[test]
    fn test_cli_overrides() {
        let config = ChefConfig::default().with_overrides(Some("mock".to_string()), None);
        assert_eq!(config.provider, "mock");
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_validate() {
        let zero = ChefConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let ftp = ChefConfig {
            base_url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        assert!(ftp.validate().is_err());

        let garbage = ChefConfig {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(garbage.validate().is_err());

        let local = ChefConfig {
            base_url: Some("http://localhost:11434".to_string()),
            ..Default::default()
        };
        local.validate().unwrap();
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk-proj-abcdef", 8), "sk-proj-***");
        assert_eq!(mask_api_key("short", 10), "short***");
        assert_eq!(mask_api_key("", 5), "");
    }
}

// ── Configuration ──
//
// Optional `sakura.yaml` in the data directory. Every field has a default,
// so a missing file or an empty document yields a usable config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SakuraError};

pub const CONFIG_FILE: &str = "sakura.yaml";
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

// ── Types ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SakuraConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

// ── Helpers ──

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SakuraConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

// ── Public API ──

impl SakuraConfig {
    /// Load `sakura.yaml` from `data_dir`, falling back to defaults when absent.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let path_str = path.display().to_string();

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(SakuraError::Config {
                    path: path_str,
                    reason: e.to_string(),
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| SakuraError::Config {
            path: path_str,
            reason: e.to_string(),
        })
    }

    /// Resolve the API key from the config, then the environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as `resolve_api_key`, with an injectable variable lookup.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }

        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|k| !k.trim().is_empty())
            .ok_or_else(|| SakuraError::Config {
                path: CONFIG_FILE.to_string(),
                reason: "api_key not set and neither GEMINI_API_KEY nor API_KEY is in the environment"
                    .to_string(),
            })
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = SakuraConfig::load(tmp.path()).unwrap();
        assert_eq!(config, SakuraConfig::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "model: gemini-2.5-pro\ntimeout_secs: 15\n",
        )
        .unwrap();

        let config = SakuraConfig::load(tmp.path()).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.api_base, default_api_base());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "timeout_secs: [not a number\n").unwrap();

        let err = SakuraConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, SakuraError::Config { .. }));
    }

    #[test]
    fn test_api_key_prefers_config() {
        let config = SakuraConfig {
            api_key: Some("from-config".to_string()),
            ..SakuraConfig::default()
        };
        let key = config
            .resolve_api_key_with(|_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn test_api_key_env_fallback_order() {
        let config = SakuraConfig::default();
        let key = config
            .resolve_api_key_with(|name| match name {
                "GEMINI_API_KEY" => Some("gemini".to_string()),
                "API_KEY" => Some("generic".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(key, "gemini");

        let key = config
            .resolve_api_key_with(|name| (name == "API_KEY").then(|| "generic".to_string()))
            .unwrap();
        assert_eq!(key, "generic");
    }

    #[test]
    fn test_api_key_missing() {
        let config = SakuraConfig {
            api_key: Some("   ".to_string()),
            ..SakuraConfig::default()
        };
        let err = config.resolve_api_key_with(|_| None).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}

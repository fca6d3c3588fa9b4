//! Runtime configuration for hf-chat-relay.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! The fallback credential is resolved from the environment once, at startup,
//! and handed to the server as plain state.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "HuggingFaceTB/SmolLM3-3B";

/// Provider identifier routed to on the Hugging Face inference router.
pub const DEFAULT_PROVIDER: &str = "hf-inference";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hf-chat-relay",
    about = "Streaming chat relay for Hugging Face inference"
)]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream provider configuration.
    pub provider: ProviderConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream inference provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider identifier the client is bound to.
    pub name: String,

    /// Base URL of the inference router.
    pub base_url: String,

    /// Model id used when the request omits one.
    pub default_model: String,

    /// Environment variable holding the fallback API token.
    pub token_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER.to_string(),
            base_url: "https://router.huggingface.co".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            token_env: "HF_TOKEN".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Read the fallback token from the configured environment variable.
    ///
    /// Empty values are treated as absent.
    pub fn fallback_token(&self) -> Option<String> {
        std::env::var(&self.provider.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.server.listen, "0.0.0.0:8000");
        assert_eq!(cfg.provider.name, "hf-inference");
        assert_eq!(cfg.provider.default_model, "HuggingFaceTB/SmolLM3-3B");
        assert_eq!(cfg.provider.token_env, "HF_TOKEN");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"provider": {"default_model": "org/other"}}"#).unwrap();
        assert_eq!(cfg.provider.default_model, "org/other");
        assert_eq!(cfg.provider.name, "hf-inference");
        assert_eq!(cfg.server.listen, "0.0.0.0:8000");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let cfg = Config::load(std::path::Path::new("/nonexistent/hf-chat-relay.json")).unwrap();
        assert_eq!(cfg.provider.base_url, "https://router.huggingface.co");
    }

    #[test]
    fn test_fallback_token_ignores_empty_and_unset() {
        let mut cfg = Config::default();
        cfg.provider.token_env = "HF_CHAT_RELAY_TEST_UNSET_TOKEN".to_string();
        assert_eq!(cfg.fallback_token(), None);

        cfg.provider.token_env = "HF_CHAT_RELAY_TEST_EMPTY_TOKEN".to_string();
        std::env::set_var("HF_CHAT_RELAY_TEST_EMPTY_TOKEN", "");
        assert_eq!(cfg.fallback_token(), None);

        cfg.provider.token_env = "HF_CHAT_RELAY_TEST_SET_TOKEN".to_string();
        std::env::set_var("HF_CHAT_RELAY_TEST_SET_TOKEN", "hf_env");
        assert_eq!(cfg.fallback_token().as_deref(), Some("hf_env"));
    }
}

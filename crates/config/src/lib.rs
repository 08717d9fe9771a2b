//! Configuration management for mcpbot
//!
//! Settings come from three layers, later layers winning: built-in defaults,
//! the JSON config file, then environment variables (a `.env` file in the
//! working directory is folded into the environment first).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub mod paths;

pub use paths::{config_path, data_dir};

/// Environment variables consulted by [`Config::apply_env`]
pub mod env {
    pub const PROVIDER: &str = "MCPBOT_PROVIDER";
    pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const API_BASE: &str = "API_BASE";
    pub const MODEL: &str = "MODEL";
    pub const OLLAMA_HOST: &str = "OLLAMA_HOST";
}

pub const DEFAULT_OPENAI_BASE: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("unknown provider '{0}' (expected 'openai' or 'ollama')")]
    InvalidProvider(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which completion API family to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible `/chat/completions` endpoint (DeepSeek, vLLM, ...)
    OpenAi,
    /// A local Ollama server speaking `/api/chat`
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "deepseek" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(ConfigError::InvalidProvider(other.to_string())),
        }
    }
}

/// Completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_max_iterations() -> u32 {
    10
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentDefaults,
}

/// Provider settings after defaults and validation, ready to build a client
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

impl Config {
    /// Load from the default location, then overlay the process environment
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_with_env(&path).await
    }

    /// Load from `path`, then overlay the process environment
    pub async fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path).await?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a specific file; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overlay environment values. `lookup` abstracts `std::env::var` so the
    /// precedence rules can be exercised without touching the process env.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = get(env::PROVIDER) {
            self.provider.kind = Some(kind.parse()?);
        }

        if let Some(host) = get(env::OLLAMA_HOST) {
            if matches!(self.provider.kind, None | Some(ProviderKind::Ollama)) {
                self.provider.kind = Some(ProviderKind::Ollama);
                self.provider.api_base = Some(host);
            }
        }

        if let Some(key) = get(env::DEEPSEEK_API_KEY).or_else(|| get(env::OPENAI_API_KEY)) {
            self.provider.api_key = key;
        }
        if let Some(base) = get(env::API_BASE) {
            self.provider.api_base = Some(base);
        }
        if let Some(model) = get(env::MODEL) {
            self.provider.model = Some(model);
        }

        Ok(())
    }

    /// Effective provider kind
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.kind.unwrap_or(ProviderKind::OpenAi)
    }

    /// Check required values and fill in per-provider defaults
    pub fn validate(&self) -> Result<ResolvedProvider> {
        let kind = self.provider_kind();
        let model = self
            .provider
            .model
            .clone()
            .filter(|m| !m.trim().is_empty());
        let api_key = Some(self.provider.api_key.clone()).filter(|k| !k.trim().is_empty());

        match kind {
            ProviderKind::OpenAi => {
                let api_key = api_key.ok_or(ConfigError::Missing("API key (DEEPSEEK_API_KEY)"))?;
                let model = model.ok_or(ConfigError::Missing("model (MODEL)"))?;
                let api_base = self
                    .provider
                    .api_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string());
                if api_base.trim().is_empty() {
                    return Err(ConfigError::Missing("API base URL (API_BASE)"));
                }
                Ok(ResolvedProvider {
                    kind,
                    api_key: Some(api_key),
                    api_base,
                    model,
                })
            }
            ProviderKind::Ollama => {
                let api_base = self
                    .provider
                    .api_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
                if api_base.trim().is_empty() {
                    return Err(ConfigError::Missing("Ollama host (OLLAMA_HOST)"));
                }
                Ok(ResolvedProvider {
                    kind,
                    api_key,
                    api_base,
                    model: model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                })
            }
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.agent.max_iterations
    }
}

/// Fold a `.env` file from the working directory (or a parent) into the
/// process environment. Returns the file used, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {:?}", path);
            Some(path)
        }
        Err(e) => {
            debug!("No .env loaded: {}", e);
            None
        }
    }
}

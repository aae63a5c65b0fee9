//! Configuration loading, validation, and management for Tutorbot.
//!
//! Loads configuration from `~/.tutorbot/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.tutorbot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat-completion provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name, used to pick a default endpoint
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Explicit chat-completion base URL (overrides the provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Dialog engine configuration
    #[serde(default)]
    pub tutor: TutorConfig,

    /// Topic data configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("gateway", &self.gateway)
            .field("tutor", &self.tutor)
            .field("knowledge", &self.knowledge)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Minimum time between two `/api/*` requests from one client (0 disables)
    #[serde(default = "default_rate_limit_interval_ms")]
    pub rate_limit_interval_ms: u64,

    /// Request body size limit
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Exact CORS origins; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    10000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_rate_limit_interval_ms() -> u64 {
    800
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            rate_limit_interval_ms: default_rate_limit_interval_ms(),
            max_body_bytes: default_max_body_bytes(),
            allowed_origins: vec![],
        }
    }
}

/// What `/api/chat` does with a session id it has never seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Create the session from the inline request fields.
    #[default]
    AutoProvision,
    /// Reject the request; the client must call `/api/normalize` first.
    RequireNormalize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// How many recent history entries are sent with each turn
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Longer learner messages are truncated to this many characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default)]
    pub session_policy: SessionPolicy,

    #[serde(default = "default_text_temperature")]
    pub text_temperature: f32,

    #[serde(default = "default_text_max_tokens")]
    pub text_max_tokens: u32,

    #[serde(default = "default_text_temperature")]
    pub quiz_temperature: f32,

    #[serde(default = "default_text_max_tokens")]
    pub quiz_max_tokens: u32,

    #[serde(default = "default_normalize_temperature")]
    pub normalize_temperature: f32,

    #[serde(default = "default_normalize_max_tokens")]
    pub normalize_max_tokens: u32,
}

fn default_history_window() -> usize {
    10
}
fn default_max_message_chars() -> usize {
    4000
}
fn default_text_temperature() -> f32 {
    0.4
}
fn default_text_max_tokens() -> u32 {
    900
}
fn default_normalize_temperature() -> f32 {
    0.2
}
fn default_normalize_max_tokens() -> u32 {
    500
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_message_chars: default_max_message_chars(),
            session_policy: SessionPolicy::default(),
            text_temperature: default_text_temperature(),
            text_max_tokens: default_text_max_tokens(),
            quiz_temperature: default_text_temperature(),
            quiz_max_tokens: default_text_max_tokens(),
            normalize_temperature: default_normalize_temperature(),
            normalize_max_tokens: default_normalize_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory holding `<subject>.json` topic files
    #[serde(default = "default_topics_dir")]
    pub topics_dir: PathBuf,
}

fn default_topics_dir() -> PathBuf {
    PathBuf::from("data/topics")
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            topics_dir: default_topics_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.tutorbot/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply process environment overrides:
    /// - `TUTORBOT_API_KEY` (highest priority), then `OPENAI_API_KEY` if no key is set
    /// - `TUTORBOT_MODEL` / `OPENAI_MODEL`
    /// - `TUTORBOT_API_URL`
    /// - `PORT`
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("TUTORBOT_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = non_empty("OPENAI_API_KEY");
        }

        if let Some(model) = non_empty("TUTORBOT_MODEL").or_else(|| non_empty("OPENAI_MODEL")) {
            self.model = model;
        }

        if let Some(url) = non_empty("TUTORBOT_API_URL") {
            self.api_url = Some(url);
        }

        if let Some(port) = non_empty("PORT") {
            match port.trim().parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT override"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".tutorbot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temperatures = [
            ("tutor.text_temperature", self.tutor.text_temperature),
            ("tutor.quiz_temperature", self.tutor.quiz_temperature),
            ("tutor.normalize_temperature", self.tutor.normalize_temperature),
        ];
        for (name, value) in temperatures {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.tutor.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "tutor.history_window must be > 0".into(),
            ));
        }

        if self.tutor.max_message_chars == 0 {
            return Err(ConfigError::ValidationError(
                "tutor.max_message_chars must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The chat-completion base URL: explicit `api_url`, else the provider default.
    pub fn base_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| default_base_url(&self.provider))
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// The effective configuration as TOML with the API key masked.
    pub fn redacted_toml(&self) -> String {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            gateway: GatewayConfig::default(),
            tutor: TutorConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

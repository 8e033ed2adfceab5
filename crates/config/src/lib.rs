//! Configuration loading, validation, and credential resolution for BenchPilot.
//!
//! Loads configuration from `~/.benchpilot/config.toml` (or the file named by
//! `BENCHPILOT_CONFIG`) with environment variable overrides. Everything that
//! can be wrong with a controller's setup is reported here, at construction
//! time, never at call time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Key sent to self-hosted endpoints that do not validate credentials.
pub const PLACEHOLDER_API_KEY: &str = "EMPTY";

/// Endpoint used when neither a key nor a base URL is configured for an
/// OpenAI-compatible family.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:8000/v1";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Controller behavior
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Per-family credentials and endpoints, keyed by family name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Pricing table version and overrides
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Vendor protocol family a controller talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// OpenAI chat completions and compatible servers (vLLM, OpenRouter, ...)
    Openai,
    /// Anthropic Messages API
    Anthropic,
    /// Gemini generateContent
    Gemini,
    /// Qwen served over an OpenAI-compatible endpoint, with tagged text tool calls
    Qwen,
}

impl ProviderFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Qwen => "qwen",
        }
    }
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "vllm" => Ok(Self::Openai),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            "qwen" => Ok(Self::Qwen),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider family '{other}'"
            ))),
        }
    }
}

/// Which sandbox capability the controller drives.
///
/// Decides the outbound tool catalog and whether tool mode is on at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Browser,
    File,
    Code,
    Jupyter,
    Shell,
    Unified,
    /// Plain free-text mode, no tool schemas sent
    None,
}

impl ClientType {
    /// Tool mode is on for every capability except `None`.
    pub fn uses_tools(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::File => "file",
            Self::Code => "code",
            Self::Jupyter => "jupyter",
            Self::Shell => "shell",
            Self::Unified => "unified",
            Self::None => "none",
        }
    }
}

impl FromStr for ClientType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "file" => Ok(Self::File),
            "code" => Ok(Self::Code),
            "jupyter" => Ok(Self::Jupyter),
            "shell" => Ok(Self::Shell),
            "unified" => Ok(Self::Unified),
            "none" | "text" => Ok(Self::None),
            other => Err(ConfigError::UnsupportedClientType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderFamily,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_client_type")]
    pub client_type: ClientType,

    /// Vendor calls allowed per turn before giving up (clamped to >= 1)
    #[serde(default = "default_max_parse_retries")]
    pub max_parse_retries: u32,

    /// Maximum tokens per vendor response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_provider() -> ProviderFamily {
    ProviderFamily::Openai
}
fn default_model() -> String {
    "gpt-4.1".into()
}
fn default_client_type() -> ClientType {
    ClientType::Unified
}
fn default_max_parse_retries() -> u32 {
    2
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            client_type: default_client_type(),
            max_parse_retries: default_max_parse_retries(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

impl ControllerConfig {
    /// Attempt bound for the correction loop, never below one.
    pub fn max_attempts(&self) -> u32 {
        self.max_parse_retries.max(1)
    }
}

/// Explicit credentials and endpoint for one family.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Self-hosted endpoint used when no key and no base URL resolve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_fallback_url: Option<String>,

    /// Gemini only: target the v1alpha API surface
    #[serde(default)]
    pub use_v1alpha: bool,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("local_fallback_url", &self.local_fallback_url)
            .field("use_v1alpha", &self.use_v1alpha)
            .finish()
    }
}

/// Pricing table configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Version tag reported alongside costs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom per-million-token pricing (model name → pricing)
    #[serde(default)]
    pub models: HashMap<String, PricingOverrideConfig>,
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input: f64,
    /// Price per 1M cached input tokens in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input: Option<f64>,
    /// Price per 1M output tokens in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<f64>,
}

/// Resolved credentials for one family.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub api_key: String,
    /// None means the vendor's public endpoint
    pub base_url: Option<String>,
    pub use_v1alpha: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key == PLACEHOLDER_API_KEY {
            PLACEHOLDER_API_KEY
        } else {
            "[REDACTED]"
        };
        f.debug_struct("Credentials")
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .field("use_v1alpha", &self.use_v1alpha)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `BENCHPILOT_CONFIG` or the default path.
    ///
    /// Environment overrides applied on top of the file:
    /// - `BENCHPILOT_PROVIDER`
    /// - `BENCHPILOT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(None)
    }

    /// Like [`AppConfig::load`], but an explicit path wins over `BENCHPILOT_CONFIG`.
    pub fn load_at(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var("BENCHPILOT_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::config_dir().join("config.toml")),
        };
        let mut config = Self::load_from(&path)?;

        if let Ok(provider) = std::env::var("BENCHPILOT_PROVIDER") {
            config.controller.provider = provider.parse()?;
        }

        if let Ok(model) = std::env::var("BENCHPILOT_MODEL") {
            config.controller.model = model;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".benchpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "controller.model must not be empty".into(),
            ));
        }

        if self.controller.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "controller.max_tokens must be > 0".into(),
            ));
        }

        if let Some(t) = self.controller.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "controller.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        for (model, p) in &self.pricing.models {
            let rates = [Some(p.input), p.cached_input, p.output];
            if rates.iter().flatten().any(|r| *r < 0.0 || !r.is_finite()) {
                return Err(ConfigError::ValidationError(format!(
                    "pricing for '{model}' must be finite and non-negative"
                )));
            }
        }

        Ok(())
    }

    /// Explicit settings for a family, if any.
    pub fn provider(&self, family: ProviderFamily) -> Option<&ProviderConfig> {
        self.providers.get(family.as_str())
    }

    /// Resolve credentials from the process environment.
    pub fn resolve_credentials(&self, family: ProviderFamily) -> Result<Credentials, ConfigError> {
        self.resolve_credentials_with(family, |name| std::env::var(name).ok())
    }

    /// Resolve credentials: explicit config → environment → local default.
    ///
    /// `env` is the variable lookup, injectable for tests.
    pub fn resolve_credentials_with(
        &self,
        family: ProviderFamily,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let explicit = self.provider(family).cloned().unwrap_or_default();
        let env_any = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| env(*n).filter(|v| !v.is_empty()))
        };

        match family {
            ProviderFamily::Openai | ProviderFamily::Qwen => {
                let api_key = explicit.api_key.or_else(|| env_any(&["OPENAI_API_KEY"]));
                let base_url = explicit
                    .base_url
                    .or_else(|| env_any(&["OPENAI_BASE_URL", "VLLM_BASE_URL"]));

                let local_url = || {
                    let url = explicit
                        .local_fallback_url
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string());
                    tracing::info!(family = %family, url = %url, "No base URL configured, using local endpoint");
                    url
                };

                // Qwen has no public endpoint, so a bare key still targets the local one.
                let (api_key, base_url) = match (api_key, base_url) {
                    (Some(key), None) if family == ProviderFamily::Qwen => (key, Some(local_url())),
                    (Some(key), url) => (key, url),
                    (None, Some(url)) => (PLACEHOLDER_API_KEY.to_string(), Some(url)),
                    (None, None) => (PLACEHOLDER_API_KEY.to_string(), Some(local_url())),
                };
                Ok(Credentials {
                    api_key,
                    base_url,
                    use_v1alpha: false,
                })
            }
            ProviderFamily::Anthropic => {
                let api_key = explicit
                    .api_key
                    .or_else(|| env_any(&["ANTHROPIC_API_KEY"]))
                    .ok_or_else(|| ConfigError::MissingCredential {
                        family: family.to_string(),
                        hint: "set ANTHROPIC_API_KEY or providers.anthropic.api_key".into(),
                    })?;
                Ok(Credentials {
                    api_key,
                    base_url: explicit.base_url.or_else(|| env_any(&["ANTHROPIC_BASE_URL"])),
                    use_v1alpha: false,
                })
            }
            ProviderFamily::Gemini => {
                let api_key = explicit
                    .api_key
                    .or_else(|| env_any(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]))
                    .ok_or_else(|| ConfigError::MissingCredential {
                        family: family.to_string(),
                        hint: "set GEMINI_API_KEY, GOOGLE_API_KEY or providers.gemini.api_key"
                            .into(),
                    })?;
                Ok(Credentials {
                    api_key,
                    base_url: explicit.base_url,
                    use_v1alpha: explicit.use_v1alpha,
                })
            }
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

    #[error("Missing API key for {family}: {hint}")]
    MissingCredential { family: String, hint: String },

    #[error("Unsupported client type: {0}")]
    UnsupportedClientType(String),
}

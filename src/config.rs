use crate::error::{Error, Result};
use crate::llm::{ApiStyle, Provider};
use crate::settings::{self, SettingsStore};
use crate::types::{BrandProfile, POST_MAX_CHARS, TOPIC_MAX_CHARS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    /// Optional second provider: drafts first, backs up the primary elsewhere.
    #[serde(default)]
    pub secondary: Option<LlmConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub brand: Option<BrandProfile>,
    #[serde(default)]
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    /// Falls back to the provider's default model.
    pub model: Option<String>,
    /// Ceiling applied to every stage's token request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_style: ApiStyle,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub moderation_model: Option<String>,
    pub image_model: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            max_tokens: default_max_tokens(),
            api_key_env: None,
            base_url: None,
            api_style: ApiStyle::default(),
            timeout_secs: default_timeout_secs(),
            moderation_model: None,
            image_model: None,
        }
    }
}

impl LlmConfig {
    pub fn api_key_env_name(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_topic_max_chars")]
    pub topic_max_chars: usize,
    #[serde(default = "default_fallback_attempts")]
    pub fallback_attempts: usize,
    /// Seed for the template generator; random when unset.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            topic_max_chars: default_topic_max_chars(),
            fallback_attempts: default_fallback_attempts(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SettingsConfig {
    /// JSON settings file; `~/.postwright/settings.json` when unset.
    pub path: Option<PathBuf>,
}

// Defaults
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_chars() -> usize {
    POST_MAX_CHARS
}
fn default_topic_max_chars() -> usize {
    TOPIC_MAX_CHARS
}
fn default_fallback_attempts() -> usize {
    10
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.max_chars == 0 || self.generation.max_chars > POST_MAX_CHARS {
            return Err(Error::config(format!(
                "generation.max_chars must be between 1 and {POST_MAX_CHARS}"
            )));
        }
        if self.generation.topic_max_chars == 0 {
            return Err(Error::config("generation.topic_max_chars must be positive"));
        }
        if self.generation.fallback_attempts == 0 {
            return Err(Error::config("generation.fallback_attempts must be positive"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be positive"));
        }
        Ok(())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .path
            .clone()
            .unwrap_or_else(settings::default_settings_path)
    }
}

/// API keys keyed by the environment-variable name they are known under.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: BTreeMap<String, String>,
}

impl Credentials {
    pub fn insert(&mut self, name: impl Into<String>, key: impl Into<String>) {
        let key = key.into().trim().to_string();
        if !key.is_empty() {
            self.keys.insert(name.into(), key);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys for the primary and secondary providers configured in `config`.
    pub fn for_config(config: &Config, settings: &dyn SettingsStore) -> Result<Self> {
        let mut credentials = Self::default();
        for llm in std::iter::once(&config.llm).chain(config.secondary.as_ref()) {
            credentials.resolve(llm.api_key_env_name(), settings)?;
        }
        Ok(credentials)
    }

    /// Resolve a key by environment variable first, then the settings store.
    pub fn resolve(
        &mut self,
        name: &str,
        settings: &dyn SettingsStore,
    ) -> Result<Option<&str>> {
        if self.keys.contains_key(name) {
            return Ok(self.get(name));
        }
        let value = match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => settings.get_setting(name)?,
        };
        if let Some(v) = value {
            self.insert(name, v);
        }
        Ok(self.get(name))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.keys.keys()).finish()
    }
}

/// Everything one generation call needs from the outside world, passed
/// explicitly rather than read from globals.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub enable_ai: bool,
    pub brand: Option<BrandProfile>,
    pub credentials: Credentials,
}

impl PipelineConfig {
    /// Read `ENABLE_AI` and the configured providers' credentials.
    pub fn resolve(config: &Config, settings: &dyn SettingsStore) -> Result<Self> {
        let enable_ai = settings.get_setting(settings::ENABLE_AI)?.as_deref() == Some("1");
        let credentials = if enable_ai {
            Credentials::for_config(config, settings)?
        } else {
            Credentials::default()
        };
        Ok(Self {
            enable_ai,
            brand: config.brand.clone(),
            credentials,
        })
    }
}

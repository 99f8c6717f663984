mod client;
pub mod parse;

pub use client::LlmClient;

use crate::config::{Credentials, LlmConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::types::ModerationVerdict;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Text-generation backend. Determines endpoints, auth and response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Hugging Face inference router.
    #[serde(rename = "huggingface", alias = "hf")]
    HuggingFace,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::HuggingFace => "https://router.huggingface.co",
        }
    }

    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::HuggingFace => "HF_API_TOKEN",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::HuggingFace => "HuggingFaceH4/zephyr-7b-beta",
        }
    }

    pub fn default_image_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-image-1",
            Self::HuggingFace => "stabilityai/stable-diffusion-2",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::HuggingFace => "huggingface",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(ProviderError::unsupported(other, "text generation")),
        }
    }
}

/// Which family of endpoints a client speaks. Resolved once when the client
/// is built and never switched per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    /// Modern unless the modern transport cannot be built.
    #[default]
    Auto,
    /// Chat completions first, Responses API second; auth baked into the transport.
    Modern,
    /// Completions first, chat completions second; auth attached per request.
    Legacy,
}

/// A text-generation backend the agent can call.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Generate text for a single-turn prompt. Never returns an empty string.
    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<String>;

    fn supports_moderation(&self) -> bool {
        false
    }

    /// Provider-side moderation of `text`.
    async fn moderate(&self, _text: &str) -> ProviderResult<ModerationVerdict> {
        Err(ProviderError::unsupported(self.name(), "moderation"))
    }
}

/// Providers available to one generation call.
#[derive(Clone)]
pub struct ProviderSet {
    pub primary: Arc<dyn TextProvider>,
    /// Drafting model and second link of every fallback chain.
    pub secondary: Option<Arc<dyn TextProvider>>,
}

impl ProviderSet {
    pub fn single(primary: Arc<dyn TextProvider>) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn TextProvider>) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

/// Builds providers from credentials at call time.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> ProviderResult<ProviderSet>;
}

/// Factory for real HTTP clients described by the `[llm]` and `[secondary]` sections.
pub struct ClientFactory {
    primary: LlmConfig,
    secondary: Option<LlmConfig>,
}

impl ClientFactory {
    pub fn new(primary: LlmConfig, secondary: Option<LlmConfig>) -> Self {
        Self { primary, secondary }
    }
}

impl ProviderFactory for ClientFactory {
    fn build(&self, credentials: &Credentials) -> ProviderResult<ProviderSet> {
        let primary = LlmClient::from_config(&self.primary, credentials)?;
        let mut set = ProviderSet::single(Arc::new(primary));
        if let Some(cfg) = &self.secondary {
            match LlmClient::from_config(cfg, credentials) {
                Ok(client) => set = set.with_secondary(Arc::new(client)),
                Err(e) => warn!(error = %e, "secondary provider unavailable, using primary only"),
            }
        }
        Ok(set)
    }
}

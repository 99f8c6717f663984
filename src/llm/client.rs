use super::parse::{self, ImagePayload};
use super::{ApiStyle, Provider, TextProvider};
use crate::config::{Credentials, LlmConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpClient;
use crate::types::ModerationVerdict;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("postwright/", env!("CARGO_PKG_VERSION"));

/// One request style a client can send a prompt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    ChatCompletions,
    Completions,
    Responses,
    HfInference,
    HfRouterChat,
}

impl Endpoint {
    fn url(self, base: &str, model: &str) -> String {
        match self {
            Self::ChatCompletions => format!("{base}/chat/completions"),
            Self::Completions => format!("{base}/completions"),
            Self::Responses => format!("{base}/responses"),
            Self::HfInference => format!("{base}/hf-inference/models/{model}"),
            Self::HfRouterChat => format!("{base}/v1/chat/completions"),
        }
    }

    fn body(self, model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> Value {
        match self {
            Self::ChatCompletions | Self::HfRouterChat => json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": max_tokens,
                "temperature": temperature,
            }),
            Self::Completions => json!({
                "model": model,
                "prompt": prompt,
                "max_tokens": max_tokens,
                "temperature": temperature,
            }),
            Self::Responses => json!({
                "model": model,
                "input": prompt,
                "max_output_tokens": max_tokens,
            }),
            Self::HfInference => json!({
                "inputs": prompt,
                "parameters": {
                    "max_new_tokens": max_tokens,
                    "temperature": temperature,
                    "return_full_text": false,
                },
            }),
        }
    }
}

/// Primary endpoint first, then the single secondary tried when it fails.
fn endpoint_chain(provider: Provider, style: ApiStyle) -> [Endpoint; 2] {
    match (provider, style) {
        (Provider::OpenAi, ApiStyle::Legacy) => [Endpoint::Completions, Endpoint::ChatCompletions],
        (Provider::OpenAi, _) => [Endpoint::ChatCompletions, Endpoint::Responses],
        (Provider::HuggingFace, _) => [Endpoint::HfInference, Endpoint::HfRouterChat],
    }
}

pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    style: ApiStyle,
    moderation_model: String,
    image_model: String,
    timeout: Duration,
    http: HttpClient,
}

impl LlmClient {
    /// Build a client, resolving the API style once.
    ///
    /// `ApiStyle::Auto` tries the modern transport (auth in default headers)
    /// and drops to the legacy one only if that construction fails.
    pub fn new(
        provider: Provider,
        api_key: String,
        model: String,
        base_url: Option<String>,
        style: ApiStyle,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ProviderError::MissingCredentials(
                provider.default_api_key_env().into(),
            ));
        }
        let bearer = format!("Bearer {api_key}");
        let modern = || {
            HttpClient::with_default_headers(
                USER_AGENT,
                timeout,
                &[("Authorization", bearer.as_str())],
            )
        };
        let (http, style) = match style {
            ApiStyle::Modern => (modern()?, ApiStyle::Modern),
            ApiStyle::Legacy => (HttpClient::new(USER_AGENT, timeout)?, ApiStyle::Legacy),
            ApiStyle::Auto => match modern() {
                Ok(http) => (http, ApiStyle::Modern),
                Err(e) => {
                    warn!(
                        provider = provider.label(),
                        error = %e,
                        "modern client init failed, using legacy style"
                    );
                    (HttpClient::new(USER_AGENT, timeout)?, ApiStyle::Legacy)
                }
            },
        };
        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().into())
            .trim_end_matches('/')
            .to_string();
        debug!(provider = provider.label(), style = ?style, %base_url, "LLM client ready");

        Ok(Self {
            provider,
            api_key,
            model,
            max_tokens: 1024,
            base_url,
            style,
            moderation_model: "omni-moderation-latest".into(),
            image_model: provider.default_image_model().into(),
            timeout,
            http,
        })
    }

    /// Build from config, reading the API key from the resolved credentials.
    pub fn from_config(cfg: &LlmConfig, credentials: &Credentials) -> ProviderResult<Self> {
        let env_var = cfg.api_key_env_name();
        let api_key = credentials
            .get(env_var)
            .ok_or_else(|| ProviderError::MissingCredentials(env_var.into()))?;
        let mut client = Self::new(
            cfg.provider,
            api_key.to_string(),
            cfg.model_name().to_string(),
            cfg.base_url.clone(),
            cfg.api_style,
            Duration::from_secs(cfg.timeout_secs),
        )?;
        client.max_tokens = cfg.max_tokens;
        if let Some(m) = &cfg.moderation_model {
            client.moderation_model = m.clone();
        }
        if let Some(m) = &cfg.image_model {
            client.image_model = m.clone();
        }
        Ok(client)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn style(&self) -> ApiStyle {
        self.style
    }

    /// Headers sent with every request. Modern clients carry auth in the transport.
    fn request_headers(&self) -> Vec<(&'static str, String)> {
        match self.style {
            ApiStyle::Legacy => vec![("Authorization", format!("Bearer {}", self.api_key))],
            _ => Vec::new(),
        }
    }

    async fn post(&self, url: &str, body: &Value) -> ProviderResult<crate::http::RawResponse> {
        let headers = self.request_headers();
        let headers: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.http.post_json(url, body, &headers).await
    }

    async fn call_endpoint(
        &self,
        endpoint: Endpoint,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<String> {
        let url = endpoint.url(&self.base_url, &self.model);
        let body = endpoint.body(&self.model, prompt, max_tokens, temperature);
        debug!(
            provider = self.provider.label(),
            endpoint = ?endpoint,
            prompt_chars = prompt.len(),
            "sending LLM request"
        );
        let response = self.post(&url, &body).await?;
        parse::parse_text_body(self.provider.label(), response.text()?)
    }

    /// Generate one image for `prompt` and write it to `out_path`.
    ///
    /// The response may carry a URL (downloaded) or base64 data (decoded);
    /// Hugging Face may also answer with raw image bytes.
    pub async fn generate_image(
        &self,
        prompt: &str,
        out_path: &Path,
        size: &str,
    ) -> ProviderResult<PathBuf> {
        let (url, body) = match self.provider {
            Provider::OpenAi => (
                format!("{}/images/generations", self.base_url),
                json!({"model": self.image_model, "prompt": prompt, "size": size, "n": 1}),
            ),
            Provider::HuggingFace => (
                Endpoint::HfInference.url(&self.base_url, &self.image_model),
                json!({"inputs": prompt}),
            ),
        };
        info!(
            provider = self.provider.label(),
            model = %self.image_model,
            size,
            "requesting image"
        );
        let response = self.post(&url, &body).await?;

        let looks_like_json = matches!(response.body.first(), Some(b'{' | b'['));
        let bytes = if response.is_json() || looks_like_json {
            let raw: Value = serde_json::from_slice(&response.body)
                .map_err(|e| ProviderError::parse(format!("image response is not JSON: {e}")))?;
            match parse::extract_image(&raw) {
                Some(ImagePayload::Url(src)) => {
                    debug!(%src, "downloading generated image");
                    // Plain client: the image host must not see our credentials.
                    HttpClient::new(USER_AGENT, self.timeout)?
                        .get_bytes(&src)
                        .await?
                }
                Some(ImagePayload::Base64(data)) => STANDARD
                    .decode(data.trim())
                    .map_err(|e| ProviderError::parse(format!("image base64: {e}")))?,
                None => {
                    return Err(ProviderError::parse(
                        "image response did not contain url or b64 data",
                    ));
                }
            }
        } else if !response.body.is_empty() {
            response.body
        } else {
            return Err(ProviderError::EmptyResponse(self.provider.label().into()));
        };

        tokio::fs::write(out_path, &bytes).await?;
        info!(path = %out_path.display(), bytes = bytes.len(), "image written");
        Ok(out_path.to_path_buf())
    }
}

#[async_trait]
impl TextProvider for LlmClient {
    fn name(&self) -> &str {
        self.provider.label()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<String> {
        let max_tokens = max_tokens.min(self.max_tokens);
        let [primary, secondary] = endpoint_chain(self.provider, self.style);

        match self.call_endpoint(primary, prompt, max_tokens, temperature).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(
                    provider = self.provider.label(),
                    endpoint = ?primary,
                    error = %e,
                    "primary endpoint failed, trying secondary"
                );
                self.call_endpoint(secondary, prompt, max_tokens, temperature)
                    .await
                    .inspect_err(|e| {
                        warn!(
                            provider = self.provider.label(),
                            endpoint = ?secondary,
                            error = %e,
                            "secondary endpoint failed"
                        );
                    })
            }
        }
    }

    fn supports_moderation(&self) -> bool {
        self.provider == Provider::OpenAi
    }

    async fn moderate(&self, text: &str) -> ProviderResult<ModerationVerdict> {
        if !self.supports_moderation() {
            return Err(ProviderError::unsupported(self.name(), "moderation"));
        }
        let url = format!("{}/moderations", self.base_url);
        let body = json!({"model": self.moderation_model, "input": text});
        let response = self.post(&url, &body).await?;
        parse::parse_moderation(self.provider.label(), response.text()?)
    }
}

use thiserror::Error;

/// Failure talking to a text/image generation backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no credentials configured for {0}")]
    MissingCredentials(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited by {provider}")]
    RateLimit {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn api_with_status(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn unsupported(provider: impl Into<String>, capability: &'static str) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            capability,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Publish error: {0}")]
    Publish(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

/// Failure of one agent stage. Always handled inside the agent.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The call succeeded but nothing usable could be extracted.
    #[error("unusable output: {0}")]
    Unusable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

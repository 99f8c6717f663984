pub mod agent;
pub mod config;
pub mod connector;
pub mod drafts;
pub mod error;
pub mod fallback;
pub mod filter;
pub mod generator;
pub mod http;
pub mod llm;
pub mod moderation;
pub mod output;
pub mod settings;
pub mod text;
pub mod types;

pub use error::{Error, ProviderError, Result};
pub use generator::PostGenerator;
pub use types::{BrandProfile, GenerationRequest, GenerationResult, ModerationVerdict, Tone};

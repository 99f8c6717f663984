//! Publishing seam. Platform connectors live outside this crate; the dry-run
//! connector validates a payload and reports what would have been sent.

use crate::error::{Error, Result};
use crate::types::{GenerationResult, POST_MAX_CHARS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// What a connector posts: message text, optional alt text and image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub message: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

impl PostPayload {
    /// The final text with as many hashtags appended as fit within the post limit.
    pub fn from_result(result: &GenerationResult, image_path: Option<PathBuf>) -> Self {
        Self {
            message: compose_message(&result.final_text, &result.hashtags),
            alt_text: result.alt_text.clone(),
            image_path,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let chars = self.message.chars().count();
        if self.message.trim().is_empty() {
            return Err(Error::Publish("message is empty".into()));
        }
        if chars > POST_MAX_CHARS {
            return Err(Error::Publish(format!(
                "message is {chars} characters, limit is {POST_MAX_CHARS}"
            )));
        }
        if let Some(path) = &self.image_path
            && !path.is_file()
        {
            return Err(Error::Publish(format!(
                "image not found: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

fn compose_message(text: &str, hashtags: &[String]) -> String {
    let mut message = text.trim().to_string();
    let mut appended = false;
    for tag in hashtags {
        let sep = if appended { " " } else { "\n\n" };
        if message.chars().count() + sep.chars().count() + tag.chars().count() > POST_MAX_CHARS {
            continue;
        }
        message.push_str(sep);
        message.push_str(tag);
        appended = true;
    }
    message
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub connector: String,
    pub status: String,
    /// Platform post id, when the platform returned one.
    pub post_id: Option<String>,
    pub payload: PostPayload,
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, payload: &PostPayload) -> Result<PublishReceipt>;
}

/// Validates and logs instead of posting.
#[derive(Debug, Default)]
pub struct DryRunConnector;

#[async_trait]
impl Connector for DryRunConnector {
    fn name(&self) -> &str {
        "dry_run"
    }

    async fn publish(&self, payload: &PostPayload) -> Result<PublishReceipt> {
        payload.validate()?;
        info!(
            chars = payload.message.chars().count(),
            alt_text = payload.alt_text.is_some(),
            image = payload.image_path.is_some(),
            "dry run: post not sent"
        );
        Ok(PublishReceipt {
            connector: self.name().to_string(),
            status: "dry_run".into(),
            post_id: None,
            payload: payload.clone(),
        })
    }
}

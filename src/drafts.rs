use crate::error::Result;
use crate::settings::postwright_dir;
use crate::types::{GenerationResult, Tone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub fn default_drafts_dir() -> PathBuf {
    postwright_dir().join("drafts")
}

/// A generated post kept for human review before publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRecord {
    pub created_at: DateTime<Utc>,
    pub topic: String,
    pub tone: Tone,
    pub result: GenerationResult,
}

impl DraftRecord {
    pub fn new(topic: impl Into<String>, tone: Tone, result: GenerationResult) -> Self {
        Self {
            created_at: Utc::now(),
            topic: topic.into(),
            tone,
            result,
        }
    }

    /// Write to `dir/<timestamp>.json` and return the path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let filename = format!("{}.json", self.created_at.format("%Y%m%dT%H%M%S%.3f"));
        let path = dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Every readable draft in `dir`, oldest first. Unreadable files are skipped.
    pub fn list(dir: &Path) -> Result<Vec<DraftRecord>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut drafts = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(crate::error::Error::from)
                .and_then(|s| serde_json::from_str::<DraftRecord>(&s).map_err(Into::into));
            match parsed {
                Ok(draft) => drafts.push(draft),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable draft"),
            }
        }
        drafts.sort_by_key(|d| d.created_at);
        Ok(drafts)
    }
}

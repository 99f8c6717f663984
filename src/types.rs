use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest topic carried into prompts and templates.
pub const TOPIC_MAX_CHARS: usize = 100;

/// Hard cap on a published post.
pub const POST_MAX_CHARS: usize = 280;

/// Brand preferences applied to one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandProfile {
    #[serde(default)]
    pub name: String,
    /// Preferred terms, used when they fit.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Terms whose presence invalidates output.
    #[serde(default)]
    pub banned: Vec<String>,
}

impl BrandProfile {
    pub fn new(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
        banned: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: dedup_terms(keywords),
            banned: dedup_terms(banned),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.keywords.is_empty() && self.banned.is_empty()
    }
}

/// Trim, drop blanks and drop case-insensitive repeats, keeping first-seen order.
fn dedup_terms(terms: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for term in terms {
        let term = term.into().trim().to_string();
        if term.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
            continue;
        }
        out.push(term);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tone {
    #[default]
    Friendly,
    Casual,
    Professional,
    /// Anything else is passed to prompts verbatim.
    Other(String),
}

impl Tone {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Friendly => "friendly",
            Self::Casual => "casual",
            Self::Professional => "professional",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for Tone {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "friendly" => Self::Friendly,
            "casual" => Self::Casual,
            "professional" => Self::Professional,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for Tone {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Tone> for String {
    fn from(t: Tone) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the topic string was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    #[default]
    Topic,
    /// Topic assembled from an image record's title/description/tags.
    Image,
}

/// A validated request. The topic is trimmed, non-empty and capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    topic: String,
    tone: Tone,
    brand: Option<BrandProfile>,
    subject: Subject,
}

impl GenerationRequest {
    pub fn new(topic: &str, tone: impl Into<Tone>, brand: Option<BrandProfile>) -> Result<Self> {
        Self::with_topic_limit(topic, tone, brand, TOPIC_MAX_CHARS)
    }

    pub fn with_topic_limit(
        topic: &str,
        tone: impl Into<Tone>,
        brand: Option<BrandProfile>,
        topic_max_chars: usize,
    ) -> Result<Self> {
        if topic_max_chars == 0 {
            return Err(Error::validation("topic length limit must be positive"));
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::validation("topic required"));
        }
        let topic = if topic.chars().count() > topic_max_chars {
            topic
                .chars()
                .take(topic_max_chars)
                .collect::<String>()
                .trim_end()
                .to_string()
        } else {
            topic.to_string()
        };
        Ok(Self {
            topic,
            tone: tone.into(),
            brand: brand.filter(|b| !b.is_empty()),
            subject: Subject::Topic,
        })
    }

    pub fn from_image(mut self) -> Self {
        self.subject = Subject::Image;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tone(&self) -> &Tone {
        &self.tone
    }

    pub fn brand(&self) -> Option<&BrandProfile> {
        self.brand.as_ref()
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    /// The brand's banned terms, or nothing when no brand is set.
    pub fn banned(&self) -> &[String] {
        self.brand.as_ref().map_or(&[], |b| b.banned.as_slice())
    }
}

/// Image metadata the generator reads to build a topic. Image bytes are never touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ImageRecord {
    /// "title description tags: a, b", falling back to the file name.
    pub fn topic(&self) -> String {
        let mut parts = Vec::new();
        if !self.title.trim().is_empty() {
            parts.push(self.title.trim().to_string());
        }
        if !self.description.trim().is_empty() {
            parts.push(self.description.trim().to_string());
        }
        let tags: Vec<&str> = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            parts.push(format!("tags: {}", tags.join(", ")));
        }
        let topic = parts.join(" ");
        if !topic.is_empty() {
            return topic;
        }
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pass/fail judgement on a post. `ok` always equals `issues.is_empty()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VerdictRepr")]
pub struct ModerationVerdict {
    ok: bool,
    issues: Vec<String>,
}

#[derive(Deserialize)]
struct VerdictRepr {
    #[serde(default)]
    issues: Vec<String>,
}

impl From<VerdictRepr> for ModerationVerdict {
    fn from(r: VerdictRepr) -> Self {
        Self::from_issues(r.issues)
    }
}

impl Default for ModerationVerdict {
    fn default() -> Self {
        Self::pass()
    }
}

impl ModerationVerdict {
    pub fn pass() -> Self {
        Self::from_issues(Vec::new())
    }

    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            ok: issues.is_empty(),
            issues,
        }
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    /// Union of both verdicts' issues, ours first, without repeats.
    pub fn merge(self, other: ModerationVerdict) -> Self {
        let mut issues = self.issues;
        for issue in other.issues {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        Self::from_issues(issues)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Candidate posts in draft order. Never empty.
    pub variants: Vec<String>,
    /// Post to publish, at most 280 characters.
    #[serde(rename = "final")]
    pub final_text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    pub moderation: ModerationVerdict,
}

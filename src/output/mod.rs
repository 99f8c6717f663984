use crate::error::{Error, Result};
use crate::types::{GenerationRequest, GenerationResult, POST_MAX_CHARS, Subject};
use askama::Template;
use chrono::Utc;

#[derive(Template)]
#[template(path = "review.html")]
struct ReviewPage {
    topic: String,
    tone: String,
    subject: &'static str,
    generated_at: String,
    final_text: String,
    char_count: usize,
    max_chars: usize,
    over_limit: bool,
    hashtags: Vec<String>,
    has_alt_text: bool,
    alt_text: String,
    moderation_ok: bool,
    issues: Vec<String>,
    variants: Vec<String>,
}

/// Render an HTML page a human can use to review (and override) a result
/// before it is published.
pub fn render_review(result: &GenerationResult, request: &GenerationRequest) -> Result<String> {
    let char_count = result.final_text.chars().count();
    let page = ReviewPage {
        topic: request.topic().to_string(),
        tone: request.tone().to_string(),
        subject: match request.subject() {
            Subject::Topic => "topic",
            Subject::Image => "image",
        },
        generated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        final_text: result.final_text.clone(),
        char_count,
        max_chars: POST_MAX_CHARS,
        over_limit: char_count > POST_MAX_CHARS,
        hashtags: result.hashtags.clone(),
        has_alt_text: result.alt_text.is_some(),
        alt_text: result.alt_text.clone().unwrap_or_default(),
        moderation_ok: result.moderation.ok(),
        issues: result.moderation.issues().to_vec(),
        variants: result.variants.clone(),
    };
    page.render()
        .map_err(|e| Error::Template(format!("review render: {e}")))
}

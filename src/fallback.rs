//! Template post generator used when the LLM path is off or unreachable.

use crate::filter::contains_banned;
use crate::text::{sanitize_topic, shorten};
use crate::types::{GenerationRequest, POST_MAX_CHARS, Tone};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Engagement templates: question, insight, behind-the-scenes, announcement,
/// informational.
const TEMPLATES: &[&str] = &[
    "{marker} {topic}: what's one tip you'd add?",
    "Quick insight about {topic}: {insight} {marker}",
    "Behind the scenes: {topic} {marker} Tell us your experience.",
    "We tried a new approach to {topic} and learned: {insight} {marker}",
    "Did you know? {topic} {marker} Share your thoughts.",
];

const INSIGHTS: &[&str] = &[
    "small changes matter",
    "consistency wins over time",
    "audience feedback shaped this",
    "we simplified the process",
    "focus on the customer experience",
];

const MARKERS: &[&str] = &["🔍", "✨", "💡", "📣", "👀", "🤝"];

/// Casual closers and their professional replacements.
const PROFESSIONAL_CLOSERS: &[(&str, &str)] = &[
    ("Tell us your experience.", "We welcome your feedback."),
    ("Share your thoughts.", "We would value your perspective."),
];

pub const DEFAULT_ATTEMPTS: usize = 10;

/// Candidate-and-reject template generator. Deterministic for a given RNG state.
pub struct TemplateGenerator<R = StdRng> {
    rng: R,
    attempts: usize,
    max_chars: usize,
}

impl TemplateGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<R: Rng> TemplateGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            attempts: DEFAULT_ATTEMPTS,
            max_chars: POST_MAX_CHARS,
        }
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.clamp(1, POST_MAX_CHARS);
        self
    }

    fn pick(&mut self, items: &'static [&'static str]) -> &'static str {
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }

    /// Fill a random template for `request`, before filtering.
    pub fn candidate(&mut self, request: &GenerationRequest) -> String {
        let template = self.pick(TEMPLATES);
        let insight = self.pick(INSIGHTS);
        let marker = self.pick(MARKERS);
        let mut post = template
            .replace("{topic}", request.topic())
            .replace("{insight}", insight)
            .replace("{marker}", marker);

        if *request.tone() == Tone::Professional {
            for (casual, formal) in PROFESSIONAL_CLOSERS {
                post = post.replace(casual, formal);
            }
        }
        if let Some(brand) = request.brand()
            && let Some(keyword) = brand.keywords.choose(&mut self.rng)
        {
            post.push(' ');
            post.push_str(keyword);
        }
        post
    }

    /// A post for `request` that contains no banned or promotional term,
    /// unless only the neutral fallback survives.
    pub fn generate(&mut self, request: &GenerationRequest) -> String {
        for attempt in 1..=self.attempts {
            let post = self.candidate(request);
            if contains_banned(&post, request.banned()) {
                debug!(attempt, "template candidate rejected");
                continue;
            }
            debug!(attempt, "template candidate accepted");
            return shorten(&post, self.max_chars);
        }
        info!(
            attempts = self.attempts,
            "all template candidates rejected, using neutral post"
        );
        self.neutral(request.topic())
    }

    /// `{marker} Thoughts on {topic}?` with the topic reduced to word characters.
    pub fn neutral(&mut self, topic: &str) -> String {
        let marker = self.pick(MARKERS);
        let topic = sanitize_topic(topic);
        let topic = if topic.is_empty() {
            "this topic"
        } else {
            topic.as_str()
        };
        shorten(&format!("{marker} Thoughts on {topic}?"), self.max_chars)
    }
}

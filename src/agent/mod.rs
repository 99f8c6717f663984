// Multi-stage post pipeline: draft → critique → select → refine → metadata → moderate

pub mod parse;
pub mod prompts;

use crate::error::StageError;
use crate::filter;
use crate::llm::{ProviderSet, TextProvider};
use crate::moderation::ModerationEvaluator;
use crate::text::shorten;
use crate::types::{GenerationRequest, GenerationResult, POST_MAX_CHARS};
use tracing::{debug, info, warn};

/// Variants requested from the draft stage.
pub const DRAFT_VARIANTS: usize = 3;

/// Score assumed when a critique fails or carries no number.
pub const DEFAULT_SCORE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Draft,
    Critique,
    Refine,
    Hashtags,
    AltText,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Critique => "critique",
            Self::Refine => "refine",
            Self::Hashtags => "hashtags",
            Self::AltText => "alt_text",
        }
    }

    /// Token budget and temperature for one call of this stage.
    fn sampling(self) -> (u32, f32) {
        match self {
            Self::Draft => (300, 0.8),
            Self::Critique => (120, 0.2),
            Self::Refine => (150, 0.6),
            Self::Hashtags => (60, 0.4),
            Self::AltText => (60, 0.2),
        }
    }
}

/// Sampling for the single-post retry after a short draft.
const SINGLE_DRAFT: (u32, f32) = (120, 0.7);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Critique {
    pub score: u8,
    pub notes: String,
}

impl Default for Critique {
    fn default() -> Self {
        Self {
            score: DEFAULT_SCORE,
            notes: String::new(),
        }
    }
}

/// Index of the best-scored critique. Ties go to the earliest variant.
pub fn select(critiques: &[Critique]) -> usize {
    let mut order: Vec<usize> = (0..critiques.len()).collect();
    // sort_by is stable, so equal scores keep draft order
    order.sort_by(|&a, &b| critiques[b].score.cmp(&critiques[a].score));
    order.first().copied().unwrap_or(0)
}

/// The neutral post used when drafting yields nothing.
pub fn neutral_post(topic: &str) -> String {
    format!("Thoughts on {}?", topic.trim())
}

/// Runs the LLM pipeline for one request.
///
/// Every stage degrades locally: a failed call never aborts the run, so
/// [`Agent::run`] always produces a complete [`GenerationResult`].
pub struct Agent {
    providers: ProviderSet,
    max_chars: usize,
}

impl Agent {
    pub fn new(providers: ProviderSet) -> Self {
        Self {
            providers,
            max_chars: POST_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.clamp(1, POST_MAX_CHARS);
        self
    }

    pub async fn run(&self, request: &GenerationRequest) -> GenerationResult {
        info!(
            topic = request.topic(),
            tone = %request.tone(),
            subject = ?request.subject(),
            secondary = self.providers.secondary.is_some(),
            "agent: starting"
        );

        let variants = self.draft(request).await;

        let mut critiques = Vec::with_capacity(variants.len());
        for (idx, variant) in variants.iter().enumerate() {
            let critique = self.critique(request, variant).await.unwrap_or_else(|e| {
                warn!(stage = "critique", variant = idx, error = %e, "using default score");
                Critique::default()
            });
            critiques.push(critique);
        }

        let top = select(&critiques);
        let (top_variant, top_critique) = match (variants.get(top), critiques.get(top)) {
            (Some(v), Some(c)) => (v.clone(), c.clone()),
            _ => (neutral_post(request.topic()), Critique::default()),
        };
        info!(
            stage = "select",
            index = top,
            score = top_critique.score,
            "agent: top variant selected"
        );

        let chosen = match self.refine(request, &top_variant, &top_critique).await {
            Ok(refined) => refined,
            Err(e) => {
                warn!(stage = "refine", error = %e, "using unrefined top variant");
                top_variant
            }
        };

        let hashtags = self.hashtags(request, &chosen).await.unwrap_or_else(|e| {
            warn!(stage = "hashtags", error = %e, "no hashtags");
            Vec::new()
        });
        let alt_text = match self.alt_text(request, &chosen).await {
            Ok(alt) => Some(alt),
            Err(e) => {
                warn!(stage = "alt_text", error = %e, "no alt text");
                None
            }
        };

        let final_text = shorten(&chosen, self.max_chars);
        let moderation = self
            .moderator()
            .evaluate(&final_text, request.banned())
            .await;

        info!(
            variants = variants.len(),
            final_chars = final_text.chars().count(),
            hashtags = hashtags.len(),
            alt_text = alt_text.is_some(),
            moderation_ok = moderation.ok(),
            "agent: done"
        );

        GenerationResult {
            variants,
            final_text,
            hashtags,
            alt_text,
            moderation,
        }
    }

    /// Providers to try for `stage`, in order. The secondary drafts first
    /// and backs up the primary everywhere else.
    fn chain(&self, stage: Stage) -> Vec<&dyn TextProvider> {
        let primary = self.providers.primary.as_ref();
        match (&self.providers.secondary, stage) {
            (Some(secondary), Stage::Draft) => vec![secondary.as_ref(), primary],
            (Some(secondary), _) => vec![primary, secondary.as_ref()],
            (None, _) => vec![primary],
        }
    }

    /// One prompt down the stage's provider chain, each link tried once.
    async fn ask(
        &self,
        stage: Stage,
        prompt: &str,
        (max_tokens, temperature): (u32, f32),
    ) -> Result<String, StageError> {
        let mut last_error = None;
        for provider in self.chain(stage) {
            debug!(
                stage = stage.as_str(),
                provider = provider.name(),
                prompt_chars = prompt.len(),
                "agent: calling provider"
            );
            match provider.generate_text(prompt, max_tokens, temperature).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        stage = stage.as_str(),
                        provider = provider.name(),
                        error = %e,
                        "agent: provider call failed"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.map_or_else(
            || StageError::Unusable("no provider configured".into()),
            StageError::Provider,
        ))
    }

    /// Always yields at least one variant.
    async fn draft(&self, request: &GenerationRequest) -> Vec<String> {
        let mut variants = match self.draft_variants(request).await {
            Ok(v) => v,
            Err(e) => {
                warn!(stage = "draft", error = %e, "multi-variant draft failed");
                Vec::new()
            }
        };
        if variants.len() < DRAFT_VARIANTS {
            info!(
                stage = "draft",
                recovered = variants.len(),
                "short draft, requesting a single post"
            );
            match self.draft_single(request).await {
                Ok(post) => variants = vec![post],
                Err(e) => warn!(stage = "draft", error = %e, "single-post draft failed"),
            }
        }
        if variants.is_empty() {
            warn!(stage = "draft", "no variants recovered, using neutral post");
            variants.push(shorten(&neutral_post(request.topic()), self.max_chars));
        }
        info!(stage = "draft", variants = variants.len(), "agent: draft complete");
        variants
    }

    async fn draft_variants(&self, request: &GenerationRequest) -> Result<Vec<String>, StageError> {
        let prompt = prompts::draft(request, DRAFT_VARIANTS, self.max_chars);
        let raw = self.ask(Stage::Draft, &prompt, Stage::Draft.sampling()).await?;
        Ok(parse::variants(&raw, DRAFT_VARIANTS, self.max_chars))
    }

    async fn draft_single(&self, request: &GenerationRequest) -> Result<String, StageError> {
        let prompt = prompts::single(request, self.max_chars);
        let raw = self.ask(Stage::Draft, &prompt, SINGLE_DRAFT).await?;
        parse::single_post(&raw, self.max_chars)
            .ok_or_else(|| StageError::Unusable("single-post draft was blank".into()))
    }

    async fn critique(
        &self,
        request: &GenerationRequest,
        variant: &str,
    ) -> Result<Critique, StageError> {
        let prompt = prompts::critique(request, variant);
        let raw = self
            .ask(Stage::Critique, &prompt, Stage::Critique.sampling())
            .await?;
        Ok(Critique {
            score: parse::score(&raw).unwrap_or(DEFAULT_SCORE),
            notes: raw.trim().to_string(),
        })
    }

    /// A rewrite that brings in banned or promotional terms the original did
    /// not have is rejected.
    async fn refine(
        &self,
        request: &GenerationRequest,
        variant: &str,
        critique: &Critique,
    ) -> Result<String, StageError> {
        let prompt = prompts::refine(request, variant, &critique.notes, self.max_chars);
        let raw = self
            .ask(Stage::Refine, &prompt, Stage::Refine.sampling())
            .await?;
        let refined = parse::single_post(&raw, self.max_chars)
            .ok_or_else(|| StageError::Unusable("refined post was blank".into()))?;
        let banned = request.banned();
        if filter::contains_banned(&refined, banned) && !filter::contains_banned(variant, banned) {
            return Err(StageError::Unusable(
                "refined post introduced banned terms".into(),
            ));
        }
        Ok(refined)
    }

    async fn hashtags(
        &self,
        request: &GenerationRequest,
        post: &str,
    ) -> Result<Vec<String>, StageError> {
        let prompt = prompts::hashtags(request, post);
        let raw = self
            .ask(Stage::Hashtags, &prompt, Stage::Hashtags.sampling())
            .await?;
        let tags: Vec<String> = parse::hashtags(&raw)
            .into_iter()
            .filter(|t| !filter::contains_banned(&t[1..], request.banned()))
            .collect();
        if tags.is_empty() {
            return Err(StageError::Unusable("no usable hashtags".into()));
        }
        Ok(tags)
    }

    async fn alt_text(&self, request: &GenerationRequest, post: &str) -> Result<String, StageError> {
        let prompt = prompts::alt_text(request, post);
        let raw = self
            .ask(Stage::AltText, &prompt, Stage::AltText.sampling())
            .await?;
        parse::alt_text(&raw).ok_or_else(|| StageError::Unusable("alt text was blank".into()))
    }

    /// First provider with a moderation endpoint, primary preferred.
    fn moderator(&self) -> ModerationEvaluator<'_> {
        std::iter::once(&self.providers.primary)
            .chain(self.providers.secondary.as_ref())
            .find(|p| p.supports_moderation())
            .map_or_else(ModerationEvaluator::heuristic_only, |p| {
                ModerationEvaluator::with_provider(p.as_ref())
            })
    }
}

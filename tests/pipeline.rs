use async_trait::async_trait;
use postwright::config::{Credentials, GenerationConfig, PipelineConfig};
use postwright::error::{ProviderError, ProviderResult};
use postwright::fallback::TemplateGenerator;
use postwright::filter::{PROMO_WORDS, contains_banned};
use postwright::llm::{ProviderFactory, ProviderSet, TextProvider};
use postwright::types::{BrandProfile, ImageRecord, ModerationVerdict};
use postwright::{Error, PostGenerator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str) -> ProviderResult<String> + Send + Sync;

/// Provider double that answers from a closure and records every prompt.
struct Scripted {
    name: &'static str,
    respond: Box<Responder>,
    moderation: Option<ModerationVerdict>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(
        name: &'static str,
        respond: impl Fn(&str) -> ProviderResult<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            respond: Box::new(respond),
            moderation: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn moderating(
        name: &'static str,
        verdict: ModerationVerdict,
        respond: impl Fn(&str) -> ProviderResult<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            respond: Box::new(respond),
            moderation: Some(verdict),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn stages(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|p| stage(p).to_string())
            .collect()
    }
}

#[async_trait]
impl TextProvider for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate_text(&self, prompt: &str, _: u32, _: f32) -> ProviderResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }

    fn supports_moderation(&self) -> bool {
        self.moderation.is_some()
    }

    async fn moderate(&self, _text: &str) -> ProviderResult<ModerationVerdict> {
        self.moderation
            .clone()
            .ok_or_else(|| ProviderError::unsupported(self.name, "moderation"))
    }
}

/// Hands out a fixed provider set, or fails like a client with no API key.
struct StaticFactory {
    set: Option<ProviderSet>,
    builds: Arc<AtomicUsize>,
}

impl ProviderFactory for StaticFactory {
    fn build(&self, _credentials: &Credentials) -> ProviderResult<ProviderSet> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.set
            .clone()
            .ok_or_else(|| ProviderError::MissingCredentials("OPENAI_API_KEY".into()))
    }
}

fn stage(prompt: &str) -> &str {
    prompt
        .lines()
        .next()
        .and_then(|l| l.strip_prefix("Stage: "))
        .unwrap_or("")
}

fn is_single_draft(prompt: &str) -> bool {
    stage(prompt) == "draft" && prompt.contains("Write 1 short")
}

fn failing(_: &str) -> ProviderResult<String> {
    Err(ProviderError::http("connection refused"))
}

fn generator(set: Option<ProviderSet>) -> (PostGenerator, Arc<AtomicUsize>) {
    let builds = Arc::new(AtomicUsize::new(0));
    let factory = StaticFactory {
        set,
        builds: builds.clone(),
    };
    let generator = PostGenerator::with_templates(
        GenerationConfig::default(),
        Box::new(factory),
        TemplateGenerator::seeded(17),
    );
    (generator, builds)
}

fn ai_on(brand: Option<BrandProfile>) -> PipelineConfig {
    PipelineConfig {
        enable_ai: true,
        brand,
        credentials: Credentials::default(),
    }
}

fn ai_off(brand: Option<BrandProfile>) -> PipelineConfig {
    PipelineConfig {
        enable_ai: false,
        brand,
        credentials: Credentials::default(),
    }
}

fn has_promo_word(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| PROMO_WORDS.contains(&w))
}

#[tokio::test]
async fn ai_disabled_uses_templates_only() {
    let provider = Scripted::new("primary", failing);
    let (mut generator, builds) = generator(Some(ProviderSet::single(provider.clone())));

    let result = generator
        .generate("social media marketing", "friendly", &ai_off(None))
        .await
        .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 0);
    assert!(provider.stages().is_empty());
    assert!(!result.final_text.is_empty());
    assert!(result.final_text.chars().count() <= 280);
    assert!(!has_promo_word(&result.final_text));
    assert_eq!(result.variants, vec![result.final_text.clone()]);
    assert!(result.moderation.ok());
}

#[tokio::test]
async fn all_provider_calls_failing_yields_neutral_post() {
    let provider = Scripted::new("primary", failing);
    let (mut generator, _) = generator(Some(ProviderSet::single(provider.clone())));

    let result = generator
        .generate("social media marketing", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.final_text, "Thoughts on social media marketing?");
    assert_eq!(result.variants, vec!["Thoughts on social media marketing?"]);
    assert!(result.hashtags.is_empty());
    assert!(result.alt_text.is_none());
    assert!(result.moderation.ok());
    // draft, single draft, one critique, refine, hashtags, alt text
    assert_eq!(provider.stages().len(), 6);
}

#[tokio::test]
async fn malformed_draft_still_completes_with_one_variant() {
    let provider = Scripted::new("primary", |prompt| {
        if is_single_draft(prompt) {
            return Err(ProviderError::parse("garbled"));
        }
        Ok(match stage(prompt) {
            "draft" => "Our studio mornings start slow, with coffee and clay on the wheel.".into(),
            "critique" => "Score: 7. Add a question.".into(),
            "refine" => "Our studio mornings start with coffee and clay. How do yours begin?".into(),
            "hashtags" => "#pottery, #studiolife, #ceramics".into(),
            "alt_text" => "Alt text: A potter shaping clay on a wheel.".into(),
            other => panic!("unexpected stage {other}"),
        })
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("studio mornings", "casual", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.variants.len(), 1);
    assert_eq!(
        result.final_text,
        "Our studio mornings start with coffee and clay. How do yours begin?"
    );
    assert_eq!(result.hashtags, vec!["#pottery", "#studiolife", "#ceramics"]);
    assert_eq!(
        result.alt_text.as_deref(),
        Some("A potter shaping clay on a wheel.")
    );
    assert!(result.moderation.ok());
}

#[tokio::test]
async fn short_draft_is_replaced_by_single_post() {
    let provider = Scripted::new("primary", |prompt| {
        if is_single_draft(prompt) {
            return Ok("A single clean post about glazes.".into());
        }
        match stage(prompt) {
            "draft" => Ok("1. First idea\n2. Second idea".into()),
            _ => Err(ProviderError::http("down")),
        }
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("glazes", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.variants, vec!["A single clean post about glazes."]);
    assert_eq!(result.final_text, "A single clean post about glazes.");
}

#[tokio::test]
async fn highest_score_wins_and_ties_keep_draft_order() {
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok("1. Alpha post\n2. Beta post\n3. Gamma post".into()),
        "critique" if prompt.contains("Post:\nAlpha") => Ok("Score: 6".into()),
        "critique" => Ok("8/10, solid".into()),
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("greek letters", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.variants, vec!["Alpha post", "Beta post", "Gamma post"]);
    assert_eq!(result.final_text, "Beta post");
}

#[tokio::test]
async fn one_failed_critique_does_not_block_others() {
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok("1. Alpha post\n2. Beta post\n3. Gamma post".into()),
        "critique" if prompt.contains("Post:\nAlpha") => Err(ProviderError::http("timeout")),
        "critique" if prompt.contains("Post:\nGamma") => Ok("Score: 9".into()),
        "critique" => Ok("no number here".into()),
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider.clone())));

    let result = generator
        .generate("greek letters", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.final_text, "Gamma post");
    let critiques = provider
        .stages()
        .iter()
        .filter(|s| s.as_str() == "critique")
        .count();
    assert_eq!(critiques, 3);
}

#[tokio::test]
async fn secondary_drafts_and_primary_reviews() {
    let primary = Scripted::new("primary", |prompt| match stage(prompt) {
        "critique" => Ok("Score: 5".into()),
        "refine" => Ok("Refined by primary".into()),
        "hashtags" => Ok("#one".into()),
        "alt_text" => Ok("A picture.".into()),
        other => panic!("primary should not see {other}"),
    });
    let secondary = Scripted::new("secondary", |prompt| match stage(prompt) {
        "draft" => Ok("1. One\n2. Two\n3. Three".into()),
        other => panic!("secondary should not see {other}"),
    });
    let set = ProviderSet::single(primary.clone()).with_secondary(secondary.clone());
    let (mut generator, _) = generator(Some(set));

    let result = generator
        .generate("two models", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.final_text, "Refined by primary");
    assert_eq!(secondary.stages(), vec!["draft"]);
    assert!(!primary.stages().contains(&"draft".to_string()));
}

#[tokio::test]
async fn failing_link_falls_through_to_other_provider() {
    let primary = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok("1. One\n2. Two\n3. Three".into()),
        _ => Err(ProviderError::http("primary down")),
    });
    let secondary = Scripted::new("secondary", |prompt| match stage(prompt) {
        "draft" => Err(ProviderError::http("secondary draft down")),
        "critique" => Ok("Score: 4".into()),
        "refine" => Ok("Refined by secondary".into()),
        _ => Err(ProviderError::http("nope")),
    });
    let set = ProviderSet::single(primary.clone()).with_secondary(secondary.clone());
    let (mut generator, _) = generator(Some(set));

    let result = generator
        .generate("fallbacks", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.variants, vec!["One", "Two", "Three"]);
    assert_eq!(result.final_text, "Refined by secondary");
    assert!(result.hashtags.is_empty());
    assert!(result.alt_text.is_none());
}

#[tokio::test]
async fn refine_that_adds_banned_terms_is_discarded() {
    let brand = BrandProfile::new("Acme", Vec::<String>::new(), ["competitorX"]);
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok("1. Handmade mugs\n2. Kiln day\n3. Glaze tests".into()),
        "critique" => Ok("Score: 5".into()),
        "refine" => Ok("Better than competitorX: handmade mugs".into()),
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("mugs", "friendly", &ai_on(Some(brand)))
        .await
        .unwrap();

    assert_eq!(result.final_text, "Handmade mugs");
    assert!(result.moderation.ok());
}

#[tokio::test]
async fn promotional_llm_output_is_flagged() {
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok("1. Big sale today\n2. Huge sale now\n3. Another sale".into()),
        "critique" => Ok("Score: 5".into()),
        "hashtags" => Ok("#sale, #pottery".into()),
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("pottery", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.final_text, "Big sale today");
    assert!(!result.moderation.ok());
    assert_eq!(result.moderation.issues(), ["promo:sale"]);
    assert_eq!(result.hashtags, vec!["#pottery"]);
}

#[tokio::test]
async fn provider_moderation_is_merged_with_heuristic() {
    let provider = Scripted::moderating(
        "primary",
        ModerationVerdict::from_issues(vec!["flagged:harassment".into()]),
        |prompt| match stage(prompt) {
            "draft" => Ok("1. One\n2. Two\n3. Three".into()),
            _ => Err(ProviderError::http("down")),
        },
    );
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("anything", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert!(!result.moderation.ok());
    assert_eq!(result.moderation.issues(), ["flagged:harassment"]);
}

#[tokio::test]
async fn leading_numbers_in_posts_are_preserved() {
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok(
            "3-day glaze retreat starts Monday\n1.5 million mugs thrown\n10/10 would wedge again"
                .into(),
        ),
        "critique" if prompt.contains("Post:\n1.5 million") => Ok("Score: 9".into()),
        "critique" => Ok("Score: 4".into()),
        "refine" => Ok("24/7 studio access is finally here for members".into()),
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider.clone())));

    let result = generator
        .generate("studio news", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(
        result.variants,
        vec![
            "3-day glaze retreat starts Monday",
            "1.5 million mugs thrown",
            "10/10 would wedge again"
        ]
    );
    assert_eq!(
        result.final_text,
        "24/7 studio access is finally here for members"
    );
    let refine_prompt = provider
        .prompts
        .lock()
        .unwrap()
        .iter()
        .find(|p| stage(p) == "refine")
        .cloned()
        .unwrap();
    assert!(refine_prompt.contains("Post:\n1.5 million mugs thrown"));
}

#[tokio::test]
async fn json_array_draft_yields_clean_variants() {
    let provider = Scripted::new("primary", |prompt| {
        if is_single_draft(prompt) {
            return Ok("Single post about clay".into());
        }
        match stage(prompt) {
            "draft" => Ok("[\n  \"Post one about clay\",\n  \"Post two about glaze\"\n]".into()),
            _ => Err(ProviderError::http("down")),
        }
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider.clone())));

    let result = generator
        .generate("clay", "friendly", &ai_on(None))
        .await
        .unwrap();

    // two items is a short draft, so the single-post call replaces them
    assert_eq!(result.variants, vec!["Single post about clay"]);
    assert!(
        provider
            .prompts
            .lock()
            .unwrap()
            .iter()
            .all(|p| !p.contains("Post:\n["))
    );
}

#[tokio::test]
async fn long_output_is_cut_at_a_word_boundary() {
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => Ok("1. One\n2. Two\n3. Three".into()),
        "critique" => Ok("Score: 5".into()),
        "refine" => Ok("clay ".repeat(100)),
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));

    let result = generator
        .generate("clay", "friendly", &ai_on(None))
        .await
        .unwrap();

    assert!(result.final_text.chars().count() <= 280);
    assert!(result.final_text.ends_with("clay…"));
}

#[tokio::test]
async fn unavailable_providers_fall_back_to_templates() {
    let (mut generator, builds) = generator(None);

    let result = generator
        .generate("social media marketing", "professional", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(result.final_text.chars().count() <= 280);
    assert!(!contains_banned(&result.final_text, &[]));
    assert!(!result.final_text.contains("Tell us your experience."));
    assert!(!result.final_text.contains("Share your thoughts."));
    assert!(result.moderation.ok());
}

#[tokio::test]
async fn banned_brand_keyword_never_reaches_template_output() {
    let brand = BrandProfile::new("Acme", ["competitorX"], ["competitorX"]);
    let (mut generator, _) = generator(None);

    let result = generator
        .generate("stoneware", "friendly", &ai_off(Some(brand)))
        .await
        .unwrap();

    assert!(!result.final_text.contains("competitorX"));
    assert!(result.final_text.ends_with("Thoughts on stoneware?"));
    assert!(result.moderation.ok());
}

#[tokio::test]
async fn same_seed_same_template_result() {
    let (mut a, _) = generator(None);
    let (mut b, _) = generator(None);
    let pipeline = ai_off(None);
    for _ in 0..5 {
        let left = a.generate("kiln day", "casual", &pipeline).await.unwrap();
        let right = b.generate("kiln day", "casual", &pipeline).await.unwrap();
        assert_eq!(left, right);
    }
}

#[tokio::test]
async fn empty_topic_is_a_validation_error() {
    let (mut generator, builds) = generator(None);
    let err = generator
        .generate("   ", "friendly", &ai_on(None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn image_record_builds_topic_and_prompt() {
    let provider = Scripted::new("primary", |prompt| match stage(prompt) {
        "draft" => {
            assert!(prompt.contains("Topic: Blue mug Hand-thrown tags: ceramics, kitchen"));
            assert!(prompt.contains("product photo"));
            Ok("1. Meet the blue mug\n2. Morning companion\n3. Hand-thrown blue".into())
        }
        _ => Err(ProviderError::http("down")),
    });
    let (mut generator, _) = generator(Some(ProviderSet::single(provider)));
    let record = ImageRecord {
        path: Some("/photos/mug.jpg".into()),
        title: "Blue mug".into(),
        description: "Hand-thrown".into(),
        tags: vec!["ceramics".into(), "kitchen".into()],
    };

    let result = generator
        .generate_from_image(&record, "friendly", &ai_on(None))
        .await
        .unwrap();

    assert_eq!(result.final_text, "Meet the blue mug");
}

#[tokio::test]
async fn empty_image_record_uses_placeholder_topic() {
    let (mut generator, _) = generator(None);
    let result = generator
        .generate_from_image(&ImageRecord::default(), "friendly", &ai_off(None))
        .await
        .unwrap();
    assert!(!result.final_text.is_empty());
    assert!(result.final_text.chars().count() <= 280);
}

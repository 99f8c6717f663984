use crate::agent::Agent;
use crate::config::{GenerationConfig, PipelineConfig};
use crate::error::Result;
use crate::fallback::TemplateGenerator;
use crate::llm::ProviderFactory;
use crate::moderation;
use crate::types::{GenerationRequest, GenerationResult, ImageRecord, Tone};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{info, warn};

/// Topic used when an image record carries no usable text.
const IMAGE_FALLBACK_TOPIC: &str = "this product";

/// Entry point for post generation: the agent when AI is enabled and a
/// provider can be built, the template generator otherwise.
pub struct PostGenerator<R = StdRng> {
    settings: GenerationConfig,
    factory: Box<dyn ProviderFactory>,
    templates: TemplateGenerator<R>,
}

impl PostGenerator<StdRng> {
    /// Seeded from `settings.seed`, or from the OS when unset.
    pub fn new(settings: GenerationConfig, factory: Box<dyn ProviderFactory>) -> Self {
        let templates = match settings.seed {
            Some(seed) => TemplateGenerator::seeded(seed),
            None => TemplateGenerator::from_os_rng(),
        };
        Self::with_templates(settings, factory, templates)
    }
}

impl<R: Rng> PostGenerator<R> {
    pub fn with_templates(
        settings: GenerationConfig,
        factory: Box<dyn ProviderFactory>,
        templates: TemplateGenerator<R>,
    ) -> Self {
        let templates = templates
            .with_attempts(settings.fallback_attempts)
            .with_max_chars(settings.max_chars);
        Self {
            settings,
            factory,
            templates,
        }
    }

    /// Validate `topic` into a request carrying the pipeline's brand.
    pub fn request(
        &self,
        topic: &str,
        tone: impl Into<Tone>,
        pipeline: &PipelineConfig,
    ) -> Result<GenerationRequest> {
        GenerationRequest::with_topic_limit(
            topic,
            tone,
            pipeline.brand.clone(),
            self.settings.topic_max_chars,
        )
    }

    /// Request for the item an image record describes.
    pub fn image_request(
        &self,
        record: &ImageRecord,
        tone: impl Into<Tone>,
        pipeline: &PipelineConfig,
    ) -> Result<GenerationRequest> {
        let topic = record.topic();
        let topic = if topic.trim().is_empty() {
            IMAGE_FALLBACK_TOPIC
        } else {
            topic.as_str()
        };
        Ok(self.request(topic, tone, pipeline)?.from_image())
    }

    /// Generate a post for `topic`. Fails only on invalid input.
    pub async fn generate(
        &mut self,
        topic: &str,
        tone: impl Into<Tone>,
        pipeline: &PipelineConfig,
    ) -> Result<GenerationResult> {
        let request = self.request(topic, tone, pipeline)?;
        Ok(self.run(&request, pipeline).await)
    }

    /// Generate a post about the item an image record describes.
    pub async fn generate_from_image(
        &mut self,
        record: &ImageRecord,
        tone: impl Into<Tone>,
        pipeline: &PipelineConfig,
    ) -> Result<GenerationResult> {
        let request = self.image_request(record, tone, pipeline)?;
        Ok(self.run(&request, pipeline).await)
    }

    /// Run a validated request down the AI or template path.
    pub async fn run(
        &mut self,
        request: &GenerationRequest,
        pipeline: &PipelineConfig,
    ) -> GenerationResult {
        if !pipeline.enable_ai {
            info!("AI disabled, using template generator");
            return self.from_template(request);
        }
        let providers = match self.factory.build(&pipeline.credentials) {
            Ok(providers) => providers,
            Err(e) => {
                warn!(error = %e, "LLM path unavailable, using template generator");
                return self.from_template(request);
            }
        };
        Agent::new(providers)
            .with_max_chars(self.settings.max_chars)
            .run(request)
            .await
    }

    fn from_template(&mut self, request: &GenerationRequest) -> GenerationResult {
        let text = self.templates.generate(request);
        let verdict = moderation::heuristic(&text, request.banned());
        GenerationResult {
            variants: vec![text.clone()],
            final_text: text,
            hashtags: Vec::new(),
            alt_text: None,
            moderation: verdict,
        }
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use postwright::config::{Config, Credentials, PipelineConfig};
use postwright::connector::{Connector, DryRunConnector, PostPayload};
use postwright::drafts::{self, DraftRecord};
use postwright::llm::{ClientFactory, LlmClient, Provider, TextProvider};
use postwright::settings::{FileSettings, SettingsStore};
use postwright::types::{
    BrandProfile, GenerationRequest, GenerationResult, ImageRecord, ModerationVerdict,
};
use postwright::{PostGenerator, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "postwright",
    about = "Social post generation with draft/critique/refine LLM stages and a template fallback"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "postwright.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Provider/model override for the primary LLM.
#[derive(clap::Args)]
struct LlmArgs {
    /// LLM provider override: openai, huggingface
    #[arg(long)]
    provider: Option<Provider>,

    /// LLM model override
    #[arg(long)]
    model: Option<String>,
}

impl LlmArgs {
    fn apply(self, config: &mut Config) {
        if let Some(provider) = self.provider
            && provider != config.llm.provider
        {
            config.llm.provider = provider;
            config.llm.model = None;
            config.llm.api_key_env = None;
            config.llm.base_url = None;
        }
        if let Some(model) = self.model {
            config.llm.model = Some(model);
        }
    }
}

#[derive(clap::Args)]
struct StyleArgs {
    /// friendly, casual, professional or any free-text tone
    #[arg(long, default_value = "friendly")]
    tone: String,

    /// Brand name (overrides the [brand] config section together with --keyword/--banned)
    #[arg(long)]
    brand_name: Option<String>,

    /// Preferred brand keyword (repeatable)
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Banned word (repeatable)
    #[arg(long = "banned")]
    banned: Vec<String>,
}

impl StyleArgs {
    fn brand(&self, config: &Config) -> Option<BrandProfile> {
        if self.brand_name.is_none() && self.keywords.is_empty() && self.banned.is_empty() {
            return config.brand.clone();
        }
        Some(BrandProfile::new(
            self.brand_name.clone().unwrap_or_default(),
            self.keywords.iter().cloned(),
            self.banned.iter().cloned(),
        ))
    }
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Write an HTML review page to this path
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Save the result as a draft for later review
    #[arg(long)]
    save: bool,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Generate a post for a topic
    Generate {
        /// What the post is about
        #[arg(short, long)]
        topic: String,

        #[command(flatten)]
        style: StyleArgs,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a post from image metadata (title, description, tags)
    FromImage {
        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Image tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Image file the record describes
        #[arg(long)]
        path: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Send a tiny prompt to the configured provider and report the outcome
    Check {
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Generate an image and write it to disk
    Image {
        #[arg(long)]
        prompt: String,

        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value = "1024x1024")]
        size: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Read or write a stored setting (ENABLE_AI, API keys)
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Validate a post and show what a connector would send (no platform is contacted)
    Publish {
        #[arg(long)]
        text: String,

        #[arg(long)]
        alt_text: Option<String>,

        /// Hashtag to append (repeatable)
        #[arg(long = "hashtag")]
        hashtags: Vec<String>,

        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// List saved drafts
    Drafts,
}

#[derive(clap::Subcommand)]
enum SettingsAction {
    Get { key: String },
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("postwright=info"))?,
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)?;
    config.validate()?;
    let store = FileSettings::new(config.settings_path());

    match cli.command {
        Command::Generate {
            topic,
            style,
            llm,
            output,
        } => {
            llm.apply(&mut config);
            let pipeline = pipeline_for(&config, &store, &style)?;
            let mut generator = generator_for(&config);
            let request = generator.request(&topic, style.tone.as_str(), &pipeline)?;
            let result = generator.run(&request, &pipeline).await;
            emit(&result, &request, &output)
        }
        Command::FromImage {
            title,
            description,
            tags,
            path,
            style,
            llm,
            output,
        } => {
            llm.apply(&mut config);
            let record = ImageRecord {
                path,
                title,
                description,
                tags,
            };
            let pipeline = pipeline_for(&config, &store, &style)?;
            let mut generator = generator_for(&config);
            let request = generator.image_request(&record, style.tone.as_str(), &pipeline)?;
            let result = generator.run(&request, &pipeline).await;
            emit(&result, &request, &output)
        }
        Command::Check { llm } => {
            llm.apply(&mut config);
            let client = direct_client(&config, &store)?;
            let reply = client
                .generate_text("Reply with the single word OK.", 5, 0.0)
                .await
                .with_context(|| format!("{} check failed", client.name()))?;
            println!(
                "{} ({}, {:?} style): {}",
                client.name(),
                client.model(),
                client.style(),
                reply.trim()
            );
            Ok(())
        }
        Command::Image {
            prompt,
            out,
            size,
            llm,
        } => {
            llm.apply(&mut config);
            let client = direct_client(&config, &store)?;
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let path = client.generate_image(&prompt, &out, &size).await?;
            println!("Image written: {}", path.display());
            Ok(())
        }
        Command::Settings { action } => match action {
            SettingsAction::Get { key } => {
                match store.get_setting(&key)? {
                    Some(value) => println!("{value}"),
                    None => println!("{key} is not set"),
                }
                Ok(())
            }
            SettingsAction::Set { key, value } => {
                store.set_setting(&key, &value)?;
                println!("{key} saved to {}", store.path().display());
                Ok(())
            }
        },
        Command::Publish {
            text,
            alt_text,
            hashtags,
            image,
        } => {
            let result = GenerationResult {
                variants: vec![text.clone()],
                final_text: text,
                hashtags: hashtags
                    .into_iter()
                    .map(|t| {
                        if t.starts_with('#') {
                            t
                        } else {
                            format!("#{t}")
                        }
                    })
                    .collect(),
                alt_text,
                moderation: ModerationVerdict::pass(),
            };
            let payload = PostPayload::from_result(&result, image);
            let receipt = DryRunConnector.publish(&payload).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        Command::Drafts => {
            let drafts = DraftRecord::list(&drafts::default_drafts_dir())?;
            if drafts.is_empty() {
                println!("No drafts saved.");
            }
            for draft in drafts {
                let flag = if draft.result.moderation.ok() {
                    "ok"
                } else {
                    "REVIEW"
                };
                println!(
                    "{}  [{flag}]  {} ({})\n    {}",
                    draft.created_at.format("%Y-%m-%d %H:%M"),
                    draft.topic,
                    draft.tone,
                    draft.result.final_text
                );
            }
            Ok(())
        }
    }
}

fn pipeline_for(
    config: &Config,
    store: &dyn SettingsStore,
    style: &StyleArgs,
) -> Result<PipelineConfig> {
    let mut pipeline = PipelineConfig::resolve(config, store)?;
    pipeline.brand = style.brand(config);
    Ok(pipeline)
}

fn generator_for(config: &Config) -> PostGenerator {
    PostGenerator::new(
        config.generation.clone(),
        Box::new(ClientFactory::new(
            config.llm.clone(),
            config.secondary.clone(),
        )),
    )
}

/// Primary client built regardless of `ENABLE_AI`; its errors reach the user.
fn direct_client(config: &Config, store: &dyn SettingsStore) -> Result<LlmClient> {
    let credentials = Credentials::for_config(config, store)?;
    Ok(LlmClient::from_config(&config.llm, &credentials)?)
}

fn emit(result: &GenerationResult, request: &GenerationRequest, output: &OutputArgs) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", result.final_text);
        if !result.hashtags.is_empty() {
            println!("{}", result.hashtags.join(" "));
        }
        if let Some(alt) = &result.alt_text {
            println!("Alt text: {alt}");
        }
        if !result.moderation.ok() {
            println!("Moderation: {}", result.moderation.issues().join(", "));
        }
    }

    if let Some(path) = &output.preview {
        let html = output::render_review(result, request)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, html)?;
        eprintln!("Review page: {}", path.display());
    }
    if output.save {
        let draft = DraftRecord::new(request.topic(), request.tone().clone(), result.clone());
        let path = draft.save(&drafts::default_drafts_dir())?;
        eprintln!("Draft saved: {}", path.display());
    }
    Ok(())
}

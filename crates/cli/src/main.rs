#![deny(warnings)]

use anyhow::Context;
use clap::{ArgGroup, Parser};
use emotion_timeline_core::config::{EngineConfig, Env, StdEnv, DEFAULT_SENTIMENT_MODEL};
use emotion_timeline_core::emotion::{EmotionLabel, FixedScoreClassifier, SentimentClassifier};
use emotion_timeline_core::pipeline::Engine;
use emotion_timeline_core::render::{AnimatedGifEncoder, CardRenderer, RenderOutcome};
use emotion_timeline_core::timeline::{ClassifierFailurePolicy, Timeline, TimelineError};
use emotion_timeline_core::util::{retry_with_backoff_until, RetryConfig};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "emotion-timeline")]
#[command(about = "Turn text into a timed sequence of emotions and an animated GIF")]
#[command(group(
    ArgGroup::new("source")
        .required(false)
        .multiple(false)
        .args(["text", "input"])
))]
#[cfg_attr(not(feature = "huggingface"), allow(dead_code))]
struct Args {
    /// Text to analyze. Reads stdin when neither --text nor --input is given.
    #[arg(long)]
    text: Option<String>,

    /// File to read the text from.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the animation.
    #[arg(long, default_value = "emotions.gif")]
    output: PathBuf,

    /// JSON engine configuration; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    hf_api_token: Option<String>,

    #[arg(long)]
    classifier_url: Option<String>,

    #[arg(long, default_value = DEFAULT_SENTIMENT_MODEL)]
    model: String,

    /// Skip the hosted model and use this confidence for every span.
    #[arg(long)]
    offline_score: Option<f32>,

    /// Label to use when the classifier fails, instead of aborting.
    #[arg(long, value_parser = parse_label)]
    degrade_to: Option<EmotionLabel>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    concurrency: Option<usize>,

    /// Attempts for the whole analysis, including the first.
    #[arg(long, default_value_t = 1)]
    attempts: u32,

    #[arg(long, default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,

    /// Print the timeline as JSON instead of the text listing.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_label(value: &str) -> Result<EmotionLabel, String> {
    EmotionLabel::parse(value).ok_or_else(|| format!("unknown emotion label: {value}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let config = build_config(&args)?;
    let text = read_text(&args)?;
    let engine = build_engine(&args, config, &env)?;
    let config = engine.config();
    tracing::info!(
        keyword_rules = config.keywords.len(),
        buckets = config.buckets.len(),
        timeout_ms = config.classifier.timeout_ms,
        "config loaded"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let _ = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let retry = RetryConfig::new(args.attempts, RETRY_INITIAL_DELAY);
    let analysis = retry_with_backoff_until(
        &retry,
        &cancel,
        || engine.analyze_with_cancel(&text, &cancel),
        TimelineError::is_retryable,
    )
    .await;
    if cancel.is_cancelled() {
        anyhow::bail!("interrupted");
    }
    let timeline = analysis.context("emotion analysis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
    } else {
        print_timeline(&timeline);
    }

    match engine
        .render_with_cancel(&timeline, &cancel)
        .await
        .context("rendering failed")?
    {
        RenderOutcome::NothingToShow => {
            println!("Nothing to show: the text has no sentences.");
        }
        RenderOutcome::Rendered(artifact) => {
            std::fs::write(&args.output, &artifact.bytes)
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            if artifact.placeholders > 0 {
                tracing::warn!(
                    placeholders = artifact.placeholders,
                    "some frames could not be drawn"
                );
            }
            tracing::info!(
                path = %args.output.display(),
                frames = artifact.frame_count,
                media_type = artifact.media_type,
                "animation written"
            );
        }
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        config.classifier.timeout_ms = timeout_ms;
    }
    if let Some(concurrency) = args.concurrency {
        config.classifier.max_concurrency = concurrency;
    }
    config.validate()?;
    Ok(config)
}

fn read_text(args: &Args) -> anyhow::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.input {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

fn build_engine(args: &Args, config: EngineConfig, env: &impl Env) -> anyhow::Result<Engine> {
    let classifier = build_classifier(args, env)?;
    let renderer = load_renderer(&args.font);
    let engine = Engine::new(
        config,
        classifier,
        Arc::new(renderer),
        Arc::new(AnimatedGifEncoder::default()),
    )?;
    Ok(match args.degrade_to {
        Some(label) => engine.with_failure_policy(ClassifierFailurePolicy::Substitute(label)),
        None => engine,
    })
}

fn build_classifier(args: &Args, env: &impl Env) -> anyhow::Result<Arc<dyn SentimentClassifier>> {
    if let Some(score) = args.offline_score {
        tracing::info!(score, "using fixed offline score");
        return Ok(Arc::new(FixedScoreClassifier::new(score)));
    }
    hosted_classifier(args, env)
}

#[cfg(feature = "huggingface")]
fn hosted_classifier(args: &Args, env: &impl Env) -> anyhow::Result<Arc<dyn SentimentClassifier>> {
    use emotion_timeline_core::config::{
        resolve_api_key, resolve_string_with_default, DEFAULT_CLASSIFIER_BASE_URL,
        ENV_CLASSIFIER_URL, ENV_HF_API_TOKEN,
    };
    use emotion_timeline_core::emotion::HuggingFaceClassifier;

    let token = resolve_api_key(args.hf_api_token.clone(), ENV_HF_API_TOKEN, env)?;
    let base_url = resolve_string_with_default(
        args.classifier_url.clone(),
        ENV_CLASSIFIER_URL,
        env,
        DEFAULT_CLASSIFIER_BASE_URL,
    );
    let classifier = HuggingFaceClassifier::new(token)?.with_model(&base_url, &args.model)?;
    tracing::info!(endpoint = %classifier.endpoint(), "using hosted classifier");
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "huggingface"))]
fn hosted_classifier(
    _args: &Args,
    _env: &impl Env,
) -> anyhow::Result<Arc<dyn SentimentClassifier>> {
    anyhow::bail!("built without the hosted classifier; pass --offline-score")
}

fn load_renderer(font: &Path) -> CardRenderer {
    match CardRenderer::from_font_file(font) {
        Ok(renderer) => renderer,
        Err(e) => {
            tracing::warn!(error = %e, "font unavailable, frames will carry no text");
            CardRenderer::default()
        }
    }
}

fn print_timeline(timeline: &Timeline) {
    if timeline.is_empty() {
        return;
    }
    println!("Analysis Results:");
    for entry in timeline {
        println!("Text: {}", entry.span());
        println!(
            "Emotion: {} {} ({} ms)",
            entry.label().title(),
            entry.glyph(),
            entry.duration().as_millis()
        );
        println!("---");
    }
}

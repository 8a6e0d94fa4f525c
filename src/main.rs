use anyhow::{Context, Result};
use bisub::audio::FfmpegDecoder;
use bisub::{print_summary, server, Config, Engines, Pipeline, PipelineConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "bisub")]
#[command(version, about = "Bilingual subtitle generation from video")]
#[command(
    long_about = "Extract speech from a video, transcribe it with OpenAI Whisper and translate every cue, producing a source and a target SRT track with identical timing."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate bilingual subtitles for a local video file
    Process {
        /// Input video file
        input: PathBuf,

        /// Source language code (e.g., en, ja, es); defaults to the configured source language
        #[arg(short, long)]
        language: Option<String>,

        /// Target language code (defaults to the configured target)
        #[arg(short, long)]
        target: Option<String>,

        /// Directory for the subtitle files (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write the full result as JSON
        #[arg(long)]
        json: bool,

        /// Number of concurrent translation requests
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to listen on (e.g., 0.0.0.0:5000)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// `<dir>/<stem>.<suffix>`, with `dir` defaulting to the input's directory.
fn derive_output_path(input: &Path, output_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let file_name = format!("{}.{}", stem.to_string_lossy(), suffix);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Process {
            input,
            language,
            target,
            output_dir,
            json,
            concurrency,
        } => {
            if let Some(language) = language {
                config.source_language = language;
            }
            if let Some(target) = target {
                config.target_language = target;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            run_process(config, &input, output_dir.as_deref(), json).await
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            run_serve(config).await
        }
    }
}

async fn run_process(
    config: Config,
    input: &Path,
    output_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    let engines = Engines::from_config(&config).context("Failed to initialize engines")?;
    let pipeline_config = PipelineConfig {
        show_progress: true,
        ..PipelineConfig::from_config(&config)
    };
    let pipeline = Pipeline::new(engines, pipeline_config);

    info!("Input:      {}", input.display());
    info!(
        "Languages:  {} -> {}",
        config.source_language, config.target_language
    );
    info!("Translator: {}", config.translator);

    let video = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let result = pipeline.process(&video, &config.source_language).await?;

    if let Some(dir) = output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut outputs = vec![
        (
            derive_output_path(input, output_dir, &format!("{}.srt", result.source.language())),
            result.source_srt.clone(),
        ),
        (
            derive_output_path(input, output_dir, &format!("{}.srt", result.target.language())),
            result.target_srt.clone(),
        ),
    ];
    if json {
        let body = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        outputs.push((derive_output_path(input, output_dir, "json"), body));
    }

    let mut written = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    print_summary(&result, &written);
    Ok(())
}

async fn run_serve(mut config: Config) -> Result<()> {
    if let Err(e) = config.validate() {
        warn!("{}; /health will report unhealthy", e);
        // Blank keys build engines that report themselves not ready.
        config.openai_api_key.get_or_insert_with(String::new);
        config.gemini_api_key.get_or_insert_with(String::new);
    }

    if let Err(e) = FfmpegDecoder::new().check_available().await {
        warn!("{}", e);
    }

    let engines = Engines::from_config(&config).context("Failed to initialize engines")?;
    let pipeline = Arc::new(Pipeline::new(engines, PipelineConfig::from_config(&config)));

    info!(
        "Readiness: {:?} (target language: {})",
        pipeline.readiness(),
        config.target_language
    );

    server::serve(pipeline, &config.bind, config.max_upload_bytes())
        .await
        .context("Server failed")?;

    Ok(())
}

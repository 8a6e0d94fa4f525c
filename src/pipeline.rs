use crate::audio::{AudioExtractor, ChunkConfig};
use crate::config::Config;
use crate::engines::{Engines, Readiness};
use crate::error::{PipelineError, Stage};
use crate::subtitle::{Segment, Track};
use crate::transcribe::TranscriptionStage;
use crate::translate::TranslationStage;
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, error, info};

/// Source language used when neither the request nor the config names one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// File name the uploaded video is written to inside the request's work dir.
const INPUT_VIDEO_FILE: &str = "input_video";

/// Configuration for the subtitle pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Language hint used when a request leaves it blank.
    pub source_language: String,
    /// Language of the translated track.
    pub target_language: String,
    /// Number of concurrent translation calls.
    pub concurrency: usize,
    /// Show a translation progress bar.
    pub show_progress: bool,
    /// How decoded audio is split before recognition.
    pub chunking: ChunkConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_language: DEFAULT_LANGUAGE.to_string(),
            target_language: "si".to_string(),
            concurrency: 4,
            show_progress: false,
            chunking: ChunkConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            concurrency: config.concurrency,
            ..Self::default()
        }
    }
}

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    AudioExtracted,
    Transcribed,
    Translated,
    Serialized,
    Complete,
    Failed(Stage),
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Received => write!(f, "received"),
            PipelineState::AudioExtracted => write!(f, "audio-extracted"),
            PipelineState::Transcribed => write!(f, "transcribed"),
            PipelineState::Translated => write!(f, "translated"),
            PipelineState::Serialized => write!(f, "serialized"),
            PipelineState::Complete => write!(f, "complete"),
            PipelineState::Failed(stage) => write!(f, "failed({})", stage),
        }
    }
}

/// Wall-clock time spent per stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub extraction_ms: u64,
    pub transcription_ms: u64,
    pub translation_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetadata {
    pub segment_count: usize,
    /// End of the last source cue in seconds, 0 for an empty track.
    pub total_duration: f64,
    /// Source language requested by the caller.
    pub language_hint: String,
    pub target_language: String,
    /// Language the recognizer reported. Informational only.
    pub detected_language: Option<String>,
    pub translation_fallbacks: usize,
    pub timings: StageTimings,
}

/// Bilingual output of one request.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub source: Track,
    pub target: Track,
    pub source_srt: String,
    pub target_srt: String,
    pub metadata: PipelineMetadata,
}

#[derive(Serialize)]
struct PipelineResponse<'a> {
    success: bool,
    source_segments: &'a [Segment],
    target_segments: &'a [Segment],
    source_srt: &'a str,
    target_srt: &'a str,
    metadata: &'a PipelineMetadata,
}

impl Serialize for PipelineResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PipelineResponse {
            success: true,
            source_segments: self.source.segments(),
            target_segments: self.target.segments(),
            source_srt: &self.source_srt,
            target_srt: &self.target_srt,
            metadata: &self.metadata,
        }
        .serialize(serializer)
    }
}

/// Tracks state transitions and stage timings for one request.
struct Run {
    state: PipelineState,
    started: Instant,
    stage_started: Instant,
    timings: StageTimings,
}

impl Run {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            state: PipelineState::Received,
            started: now,
            stage_started: now,
            timings: StageTimings::default(),
        }
    }

    fn advance(&mut self, next: PipelineState) -> Duration {
        let elapsed = self.stage_started.elapsed();
        debug!("Pipeline {} -> {} ({:.2}s)", self.state, next, elapsed.as_secs_f64());
        self.state = next;
        self.stage_started = Instant::now();
        elapsed
    }

    fn fail(&mut self, err: &PipelineError) {
        self.state = PipelineState::Failed(err.stage());
        error!(stage = %err.stage(), "Pipeline failed: {}", err);
    }

    fn finish(&mut self) -> StageTimings {
        self.advance(PipelineState::Complete);
        self.timings.total_ms = millis(self.started.elapsed());
        self.timings.clone()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// The media-to-subtitle orchestrator.
///
/// Engines are injected once and shared by every call to [`Pipeline::process`];
/// nothing else is shared between requests.
pub struct Pipeline {
    engines: Engines,
    extractor: AudioExtractor,
    transcription: TranscriptionStage,
    translation: TranslationStage,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(engines: Engines, config: PipelineConfig) -> Self {
        Self {
            extractor: AudioExtractor::new(engines.decoder.clone())
                .with_chunking(config.chunking.clone()),
            transcription: TranscriptionStage::new(engines.transcriber.clone()),
            translation: TranslationStage::new(engines.translator.clone(), config.concurrency)
                .with_progress(config.show_progress),
            engines,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn readiness(&self) -> Readiness {
        self.engines.readiness()
    }

    /// Turn video bytes into source and target subtitle tracks.
    ///
    /// A blank `language` falls back to the configured source language.
    /// Extraction and transcription failures end the request; translation
    /// failures are absorbed per cue. Nothing is retried.
    pub async fn process(
        &self,
        video: &[u8],
        language: &str,
    ) -> Result<PipelineResult, PipelineError> {
        let mut run = Run::new();
        let result = self.run(video, language, &mut run).await;
        if let Err(ref err) = result {
            run.fail(err);
        }
        result
    }

    async fn run(
        &self,
        video: &[u8],
        language: &str,
        run: &mut Run,
    ) -> Result<PipelineResult, PipelineError> {
        if video.is_empty() {
            return Err(PipelineError::Input("No video data provided".to_string()));
        }

        let language = match language.trim() {
            "" => self.config.source_language.as_str(),
            code => code,
        };
        let target_language = self.config.target_language.as_str();

        info!(
            "Processing {} bytes of video ({} -> {})",
            video.len(),
            language,
            target_language
        );

        // Dropped on every return path, taking the intermediate files with it.
        let workdir = TempDir::new().map_err(|e| PipelineError::internal(Stage::Extraction, e))?;
        let video_path: PathBuf = workdir.path().join(INPUT_VIDEO_FILE);
        tokio::fs::write(&video_path, video)
            .await
            .map_err(|e| PipelineError::internal(Stage::Extraction, e))?;

        info!("Stage 1/4: Extracting audio");
        let audio = self.extractor.extract(&video_path, workdir.path()).await?;
        run.timings.extraction_ms = millis(run.advance(PipelineState::AudioExtracted));

        info!("Stage 2/4: Transcribing");
        let transcription = self.transcription.transcribe(&audio, language).await?;
        if transcription.track.is_empty() {
            return Err(PipelineError::Transcription(
                "no speech segments were recognized".to_string(),
            ));
        }
        if let Some(ref detected) = transcription.detected_language {
            if !detected.eq_ignore_ascii_case(language) {
                info!(
                    "Recognizer reported language '{}' for requested '{}'",
                    detected, language
                );
            }
        }
        run.timings.transcription_ms = millis(run.advance(PipelineState::Transcribed));

        info!("Stage 3/4: Translating to {}", target_language);
        let source = transcription.track;
        let translated = self
            .translation
            .translate_track(&source, target_language)
            .await;
        run.timings.translation_ms = millis(run.advance(PipelineState::Translated));

        info!("Stage 4/4: Serializing subtitles");
        let source_srt = source.to_srt();
        let target_srt = translated.track.to_srt();
        run.advance(PipelineState::Serialized);

        let metadata = PipelineMetadata {
            segment_count: source.len(),
            total_duration: source.total_duration(),
            language_hint: language.to_string(),
            target_language: target_language.to_string(),
            detected_language: transcription.detected_language,
            translation_fallbacks: translated.fallbacks,
            timings: run.finish(),
        };

        info!(
            "Generated {} bilingual segments ({} fallbacks) in {:.2}s",
            metadata.segment_count,
            metadata.translation_fallbacks,
            metadata.timings.total_ms as f64 / 1000.0
        );

        Ok(PipelineResult {
            source,
            target: translated.track,
            source_srt,
            target_srt,
            metadata,
        })
    }
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult, outputs: &[PathBuf]) {
    let metadata = &result.metadata;
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                 Bilingual Subtitle Generation Complete         ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    for output in outputs {
        println!("  Output:     {}", output.display());
    }
    println!("  Segments:   {}", metadata.segment_count);
    println!(
        "  Languages:  {} -> {}",
        metadata.language_hint, metadata.target_language
    );
    println!("  Duration:   {:.1}s", metadata.total_duration);
    if metadata.translation_fallbacks > 0 {
        println!(
            "  Fallbacks:  {} segment(s) kept source text",
            metadata.translation_fallbacks
        );
    }
    println!();
    println!("  Timing:");
    println!(
        "    Extract:     {:.2}s",
        metadata.timings.extraction_ms as f64 / 1000.0
    );
    println!(
        "    Transcribe:  {:.2}s",
        metadata.timings.transcription_ms as f64 / 1000.0
    );
    println!(
        "    Translate:   {:.2}s",
        metadata.timings.translation_ms as f64 / 1000.0
    );
    println!(
        "    Total:       {:.2}s",
        metadata.timings.total_ms as f64 / 1000.0
    );
    if let Some(ref lang) = metadata.detected_language {
        if !lang.eq_ignore_ascii_case(&metadata.language_hint) {
            println!();
            println!(
                "  Note: Recognizer reported language '{}' (requested '{}')",
                lang, metadata.language_hint
            );
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

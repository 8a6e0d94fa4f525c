pub mod whisper;

pub use whisper::{WhisperClient, WhisperModel};

use crate::audio::{AudioChunk, AudioStream};
use crate::error::{PipelineError, Result};
use crate::subtitle::{Segment, Track, TrackRole};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One utterance as the recognition engine reported it, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Utterance {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub utterances: Vec<Utterance>,
    /// Language the engine says it heard, if it reports one.
    pub language: Option<String>,
}

/// Speech recognition engine.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognize speech in one chunk. Timestamps are relative to the start of
    /// the chunk. `language_hint` biases recognition but is not a guarantee.
    async fn transcribe(&self, chunk: &AudioChunk, language_hint: &str) -> Result<Transcript>;

    fn name(&self) -> &'static str;

    /// Whether the engine is loaded and able to take calls.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Source track produced by the transcription stage.
#[derive(Debug, Clone)]
pub struct TranscriptionOutput {
    pub track: Track,
    pub detected_language: Option<String>,
    /// Utterances discarded because they had no usable text or timing.
    pub dropped: usize,
}

/// Turn raw utterances into cues, keeping engine order.
///
/// Blank text and unusable starts are dropped. An end before the start is
/// pulled up to the start.
pub fn segments_from_utterances(utterances: Vec<Utterance>) -> (Vec<Segment>, usize) {
    let mut segments = Vec::with_capacity(utterances.len());
    let mut dropped = 0;

    for utterance in utterances {
        if !utterance.start.is_finite() || utterance.start < 0.0 {
            warn!(
                "Dropping utterance with invalid start {}: {:?}",
                utterance.start, utterance.text
            );
            dropped += 1;
            continue;
        }

        let end = if utterance.end.is_finite() && utterance.end >= utterance.start {
            utterance.end
        } else {
            debug!(
                "Clamping end {} to start {} for {:?}",
                utterance.end, utterance.start, utterance.text
            );
            utterance.start
        };

        match Segment::new(utterance.start, end, &utterance.text) {
            Ok(segment) => segments.push(segment),
            Err(e) => {
                debug!("Dropping utterance at {:.3}s: {}", utterance.start, e);
                dropped += 1;
            }
        }
    }

    (segments, dropped)
}

/// Transcription stage.
pub struct TranscriptionStage {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionStage {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// Recognize `audio` into a source track.
    ///
    /// Chunks are recognized one after another and each chunk's utterances
    /// are shifted by its start, so cues stay in track order. No speech is an
    /// empty track, not an error; deciding whether an empty track is
    /// acceptable is the caller's business. Engine faults map to
    /// [`PipelineError::Transcription`].
    pub async fn transcribe(
        &self,
        audio: &AudioStream,
        language_hint: &str,
    ) -> std::result::Result<TranscriptionOutput, PipelineError> {
        debug!(
            "Transcribing {:?} in {} chunk(s) with {} (hint: {})",
            audio.path,
            audio.chunks.len(),
            self.transcriber.name(),
            language_hint
        );

        let mut utterances = Vec::new();
        let mut language = None;

        for chunk in &audio.chunks {
            let transcript = self
                .transcriber
                .transcribe(chunk, language_hint)
                .await
                .map_err(|e| {
                    PipelineError::Transcription(format!("chunk {}: {}", chunk.index + 1, e))
                })?;

            let offset = chunk.region.start.as_secs_f64();
            utterances.extend(transcript.utterances.into_iter().map(|u| Utterance {
                start: u.start + offset,
                end: u.end + offset,
                text: u.text,
            }));
            if language.is_none() {
                language = transcript.language;
            }
        }

        let (segments, dropped) = segments_from_utterances(utterances);

        info!(
            "Transcription produced {} segments ({} dropped), language: {}",
            segments.len(),
            dropped,
            language.as_deref().unwrap_or("unknown")
        );

        Ok(TranscriptionOutput {
            track: Track::from_segments(TrackRole::Source, language_hint, segments),
            detected_language: language,
            dropped,
        })
    }
}

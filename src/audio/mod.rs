pub mod chunk;
pub mod extract;

pub use chunk::{plan_chunks, ChunkConfig, Region};
pub use extract::{parse_probe_output, FfmpegDecoder};

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Sample rate of the decoded audio handed to the recognizer.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// File name of the decoded audio inside the request's work directory.
pub const EXTRACTED_AUDIO_FILE: &str = "audio.wav";

/// Metadata about an audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

/// One piece of the decoded audio, small enough for a single recognizer call.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub index: usize,
    /// Position of the chunk in the full track.
    pub region: Region,
    pub path: PathBuf,
}

/// Decoded audio ready for recognition.
#[derive(Debug, Clone)]
pub struct AudioStream {
    pub path: PathBuf,
    pub metadata: AudioMetadata,
    /// Consecutive chunks covering the track, in order. Never empty.
    pub chunks: Vec<AudioChunk>,
}

impl AudioStream {
    /// A stream recognized in one piece.
    pub fn single(path: PathBuf, metadata: AudioMetadata) -> Self {
        let chunk = AudioChunk {
            index: 0,
            region: Region {
                start: Duration::ZERO,
                end: metadata.duration,
            },
            path: path.clone(),
        };
        Self {
            path,
            metadata,
            chunks: vec![chunk],
        }
    }
}

/// Container demuxing and audio decoding.
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    /// Inspect a container. `Ok(None)` means it holds no audio track.
    async fn probe(&self, input: &Path) -> Result<Option<AudioMetadata>>;

    /// Decode the first audio track of `input` to mono 16-bit WAV at `output`.
    async fn decode_audio(&self, input: &Path, output: &Path) -> Result<()>;

    /// Copy `region` of the decoded WAV `input` to `output`.
    async fn extract_segment(&self, input: &Path, output: &Path, region: Region) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Audio extraction stage: probe, decode into the work directory, then
/// split into recognizer-sized chunks.
pub struct AudioExtractor {
    decoder: Arc<dyn MediaDecoder>,
    chunking: ChunkConfig,
}

impl AudioExtractor {
    pub fn new(decoder: Arc<dyn MediaDecoder>) -> Self {
        Self {
            decoder,
            chunking: ChunkConfig::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Extract the audio track of `video` into `workdir`.
    ///
    /// Every decoder fault, and a container without audio, comes back as
    /// [`PipelineError::Extraction`].
    pub async fn extract(
        &self,
        video: &Path,
        workdir: &Path,
    ) -> std::result::Result<AudioStream, PipelineError> {
        debug!("Probing {:?} with {}", video, self.decoder.name());

        let source = self
            .decoder
            .probe(video)
            .await
            .map_err(|e| PipelineError::Extraction(e.to_string()))?
            .ok_or_else(|| {
                PipelineError::Extraction("container has no audio track".to_string())
            })?;

        let output = workdir.join(EXTRACTED_AUDIO_FILE);
        self.decoder
            .decode_audio(video, &output)
            .await
            .map_err(|e| PipelineError::Extraction(e.to_string()))?;

        info!(
            "Extracted {:.1}s of audio ({} Hz, {} ch source)",
            source.duration.as_secs_f64(),
            source.sample_rate,
            source.channels
        );

        let metadata = AudioMetadata {
            duration: source.duration,
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
        };

        let regions = plan_chunks(metadata.duration, &self.chunking);
        if regions.len() == 1 {
            return Ok(AudioStream::single(output, metadata));
        }

        info!("Splitting audio into {} chunks", regions.len());
        let mut chunks = Vec::with_capacity(regions.len());
        for (index, region) in regions.into_iter().enumerate() {
            let path = workdir.join(format!("chunk_{:04}.wav", index));
            debug!(
                "Creating chunk {}: {:?} to {:?}",
                index, region.start, region.end
            );
            self.decoder
                .extract_segment(&output, &path, region)
                .await
                .map_err(|e| PipelineError::Extraction(e.to_string()))?;
            chunks.push(AudioChunk {
                index,
                region,
                path,
            });
        }

        Ok(AudioStream {
            path: output,
            metadata,
            chunks,
        })
    }
}

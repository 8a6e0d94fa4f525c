use std::time::Duration;

use super::TARGET_SAMPLE_RATE;

/// Largest chunk file handed to the recognizer, kept under Whisper's 25 MB
/// upload limit.
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 24 * 1024 * 1024;

const BYTES_PER_SAMPLE: u64 = 2;
const WAV_HEADER_SIZE: u64 = 44;

/// Configuration for audio chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkConfig {
    /// Longest span of audio per chunk.
    pub max_duration: Duration,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::for_max_file_size(DEFAULT_MAX_CHUNK_BYTES)
    }
}

impl ChunkConfig {
    /// Longest chunk whose decoded WAV stays within `max_bytes`.
    pub fn for_max_file_size(max_bytes: u64) -> Self {
        let bytes_per_sec = u64::from(TARGET_SAMPLE_RATE) * BYTES_PER_SAMPLE;
        let secs = max_bytes.saturating_sub(WAV_HEADER_SIZE) / bytes_per_sec;
        Self {
            max_duration: Duration::from_secs(secs.max(1)),
        }
    }

    pub fn with_max_duration(max_duration: Duration) -> Self {
        Self {
            max_duration: max_duration.max(Duration::from_secs(1)),
        }
    }
}

/// A time span of the source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: Duration,
    pub end: Duration,
}

impl Region {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Split `total_duration` into consecutive regions no longer than the
/// configured maximum. Zero or unknown duration yields one open region.
pub fn plan_chunks(total_duration: Duration, config: &ChunkConfig) -> Vec<Region> {
    if total_duration <= config.max_duration {
        return vec![Region {
            start: Duration::ZERO,
            end: total_duration,
        }];
    }

    let mut chunks = Vec::new();
    let mut current = Duration::ZERO;

    while current < total_duration {
        let end = (current + config.max_duration).min(total_duration);
        chunks.push(Region {
            start: current,
            end,
        });
        current = end;
    }

    chunks
}

/// Estimate file size for a decoded WAV chunk (16-bit mono).
pub fn estimate_wav_size(duration: Duration) -> u64 {
    let samples = (duration.as_secs_f64() * f64::from(TARGET_SAMPLE_RATE)) as u64;
    WAV_HEADER_SIZE + samples * BYTES_PER_SAMPLE
}

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{BisubError, Result};

use super::{AudioMetadata, MediaDecoder, Region, TARGET_SAMPLE_RATE};

/// Media decoder backed by the `ffprobe` and `ffmpeg` executables.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use executables at explicit paths instead of looking them up in PATH.
    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check that both executables run.
    pub async fn check_available(&self) -> Result<()> {
        for binary in [&self.ffmpeg, &self.ffprobe] {
            let output = Command::new(binary)
                .arg("-version")
                .output()
                .await
                .map_err(|e| {
                    BisubError::AudioExtraction(format!(
                        "{binary} not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
                    ))
                })?;

            if !output.status.success() {
                return Err(BisubError::AudioExtraction(format!(
                    "{binary} check failed"
                )));
            }
        }

        debug!("FFmpeg and FFprobe are available");
        Ok(())
    }
}

#[async_trait]
impl MediaDecoder for FfmpegDecoder {
    async fn probe(&self, input: &Path) -> Result<Option<AudioMetadata>> {
        if !input.exists() {
            return Err(BisubError::FileNotFound(input.display().to_string()));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=sample_rate,channels:format=duration",
                "-of",
                "json",
            ])
            .arg(input)
            .output()
            .await
            .map_err(|e| BisubError::AudioExtraction(format!("Failed to run FFprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BisubError::AudioExtraction(format!(
                "FFprobe could not read the container: {}",
                stderr.trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn decode_audio(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Decoding audio from {}", input.display());

        let sample_rate = TARGET_SAMPLE_RATE.to_string();
        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-i"])
            .arg(input)
            .args(["-vn", "-map", "0:a:0", "-acodec", "pcm_s16le", "-ar"])
            .arg(&sample_rate)
            .args(["-ac", "1"])
            .arg(output)
            .output()
            .await
            .map_err(|e| BisubError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(BisubError::AudioExtraction(format!(
                "FFmpeg audio extraction failed: {}",
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(BisubError::AudioExtraction(
                "Output file was not created".to_string(),
            ));
        }

        debug!("Audio decoded to {}", output.display());
        Ok(())
    }

    async fn extract_segment(&self, input: &Path, output: &Path, region: Region) -> Result<()> {
        let duration = region.duration();
        if duration.is_zero() {
            return Err(BisubError::AudioExtraction(
                "Segment duration is zero".to_string(),
            ));
        }

        let start_secs = format!("{:.3}", region.start.as_secs_f64());
        let duration_secs = format!("{:.3}", duration.as_secs_f64());
        let sample_rate = TARGET_SAMPLE_RATE.to_string();

        debug!(
            "Extracting segment: start={}, duration={}",
            start_secs, duration_secs
        );

        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-ss"])
            .arg(&start_secs)
            .arg("-t")
            .arg(&duration_secs)
            .arg("-i")
            .arg(input)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
            .arg(&sample_rate)
            .args(["-ac", "1"])
            .arg(output)
            .output()
            .await
            .map_err(|e| BisubError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(BisubError::AudioExtraction(format!(
                "FFmpeg segment extraction failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output. No audio stream yields `Ok(None)`.
pub fn parse_probe_output(json: &str) -> Result<Option<AudioMetadata>> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let Some(stream) = probe.streams.into_iter().next() else {
        return Ok(None);
    };

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::ZERO);

    let sample_rate = stream
        .sample_rate
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);

    Ok(Some(AudioMetadata {
        duration,
        sample_rate,
        channels: stream.channels.unwrap_or(0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_parse_probe_with_audio() {
        let json = r#"{
            "programs": [],
            "streams": [{"sample_rate": "44100", "channels": 2}],
            "format": {"duration": "12.500000"}
        }"#;

        let metadata = parse_probe_output(json).unwrap().unwrap();
        assert_eq!(metadata.duration, Duration::from_millis(12_500));
        assert_eq!(metadata.sample_rate, 44_100);
        assert_eq!(metadata.channels, 2);
    }

    #[test]
    fn test_parse_probe_without_audio_stream() {
        let json = r#"{"programs": [], "streams": [], "format": {"duration": "3.0"}}"#;
        assert!(parse_probe_output(json).unwrap().is_none());

        let json = r#"{"format": {"duration": "3.0"}}"#;
        assert!(parse_probe_output(json).unwrap().is_none());
    }

    #[test]
    fn test_parse_probe_tolerates_missing_duration() {
        let json = r#"{"streams": [{"sample_rate": "16000", "channels": 1}]}"#;
        let metadata = parse_probe_output(json).unwrap().unwrap();
        assert_eq!(metadata.duration, Duration::ZERO);
        assert_eq!(metadata.sample_rate, 16_000);
    }

    #[test]
    fn test_parse_probe_rejects_garbage() {
        assert!(parse_probe_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_probe_file_not_found() {
        let decoder = FfmpegDecoder::new();
        let result = decoder.probe(Path::new("/nonexistent/file.mp4")).await;

        match result {
            Err(BisubError::FileNotFound(path)) => assert!(path.contains("nonexistent")),
            other => panic!("Expected FileNotFound error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_segment_rejects_empty_region() {
        let decoder = FfmpegDecoder::new();
        let region = Region {
            start: Duration::from_secs(3),
            end: Duration::from_secs(3),
        };
        let result = decoder
            .extract_segment(Path::new("/tmp/a.wav"), Path::new("/tmp/b.wav"), region)
            .await;
        assert!(matches!(result, Err(BisubError::AudioExtraction(_))));
    }

    #[tokio::test]
    async fn test_check_available_with_missing_binary() {
        let decoder = FfmpegDecoder::with_binaries("definitely-not-ffmpeg", "ffprobe");
        assert!(decoder.check_available().await.is_err());
    }

    #[tokio::test]
    async fn test_probe_rejects_non_media_file() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input_video");
        std::fs::write(&input, b"this is not a video").unwrap();

        let decoder = FfmpegDecoder::new();
        assert!(decoder.probe(&input).await.is_err());
    }
}

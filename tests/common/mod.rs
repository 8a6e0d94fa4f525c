//! Test doubles for the pipeline's collaborators.
#![allow(dead_code)]

use async_trait::async_trait;
use bisub::audio::chunk::estimate_wav_size;
use bisub::audio::{AudioChunk, AudioMetadata, MediaDecoder, Region};
use bisub::error::{BisubError, Result};
use bisub::transcribe::{Transcriber, Transcript, Utterance};
use bisub::translate::Translator;
use bisub::{Engines, Pipeline, PipelineConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct MockDecoder {
    pub has_audio: bool,
    pub fail: bool,
    pub duration: Duration,
    /// Write chunk files at the size ffmpeg would produce.
    pub sized_segments: bool,
    pub decodes: AtomicUsize,
    pub segments: AtomicUsize,
    /// Every path the decoder read from or wrote to.
    pub touched: Mutex<Vec<PathBuf>>,
}

impl MockDecoder {
    pub fn with_audio() -> Self {
        Self {
            has_audio: true,
            fail: false,
            duration: Duration::from_secs(5),
            sized_segments: false,
            decodes: AtomicUsize::new(0),
            segments: AtomicUsize::new(0),
            touched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            ..Self::with_audio()
        }
    }

    pub fn without_audio() -> Self {
        Self {
            has_audio: false,
            ..Self::with_audio()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_audio()
        }
    }

    pub fn touched(&self) -> Vec<PathBuf> {
        self.touched.lock().unwrap().clone()
    }

    fn record(&self, path: &Path) {
        self.touched.lock().unwrap().push(path.to_path_buf());
    }
}

#[async_trait]
impl MediaDecoder for MockDecoder {
    async fn probe(&self, input: &Path) -> Result<Option<AudioMetadata>> {
        self.record(input);
        if !input.exists() {
            return Err(BisubError::FileNotFound(input.display().to_string()));
        }
        if self.fail {
            return Err(BisubError::AudioExtraction("corrupt container".to_string()));
        }
        Ok(self.has_audio.then(|| AudioMetadata {
            duration: self.duration,
            sample_rate: 44_100,
            channels: 2,
        }))
    }

    async fn decode_audio(&self, _input: &Path, output: &Path) -> Result<()> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.record(output);
        tokio::fs::write(output, b"RIFF").await?;
        Ok(())
    }

    async fn extract_segment(&self, _input: &Path, output: &Path, region: Region) -> Result<()> {
        self.segments.fetch_add(1, Ordering::SeqCst);
        self.record(output);
        let size = if self.sized_segments {
            estimate_wav_size(region.duration()) as usize
        } else {
            4
        };
        tokio::fs::write(output, vec![0u8; size]).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock-decoder"
    }
}

pub struct MockTranscriber {
    pub utterances: Vec<Utterance>,
    pub language: Option<String>,
    pub fail: bool,
    pub ready: bool,
    pub calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new(utterances: Vec<Utterance>) -> Self {
        Self {
            utterances,
            language: Some("en".to_string()),
            fail: false,
            ready: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, chunk: &AudioChunk, _language_hint: &str) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(chunk.path.exists(), "decoded audio should exist during transcription");
        if self.fail {
            return Err(BisubError::Api("recognizer unavailable".to_string()));
        }
        Ok(Transcript {
            utterances: self.utterances.clone(),
            language: self.language.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "mock-transcriber"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Wraps text in brackets. Earlier calls sleep longer so completions arrive
/// out of order.
pub struct MockTranslator {
    pub fail_on: HashSet<String>,
    pub calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            fail_on: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            fail_on: texts.iter().map(|t| t.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _source_lang: &str, _target_lang: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(call * 3))).await;
        if self.fail_on.contains(text) {
            return Err(BisubError::Translation("rate limited".to_string()));
        }
        Ok(format!("[{}]", text))
    }

    fn name(&self) -> &'static str {
        "mock-translator"
    }
}

pub fn pipeline(
    decoder: Arc<MockDecoder>,
    transcriber: Arc<MockTranscriber>,
    translator: Arc<MockTranslator>,
) -> Pipeline {
    pipeline_with_config(decoder, transcriber, translator, PipelineConfig::default())
}

pub fn pipeline_with_config(
    decoder: Arc<dyn MediaDecoder>,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
) -> Pipeline {
    Pipeline::new(Engines::new(decoder, transcriber, translator), config)
}

pub fn hello_world() -> Vec<Utterance> {
    vec![
        Utterance::new(0.0, 2.0, "Hello"),
        Utterance::new(2.0, 5.0, "World"),
    ]
}

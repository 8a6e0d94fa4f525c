use crate::audio::AudioChunk;
use crate::error::{BisubError, Result};
use crate::transcribe::{Transcriber, Transcript, Utterance};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Maximum file size for Whisper API (25 MB).
const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// Whisper model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhisperModel {
    #[default]
    #[serde(rename = "whisper-1")]
    Whisper1,
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
}

impl WhisperModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhisperModel::Whisper1 => "whisper-1",
            WhisperModel::Gpt4oTranscribe => "gpt-4o-transcribe",
            WhisperModel::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
        }
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whisper-1" => Ok(WhisperModel::Whisper1),
            "gpt-4o-transcribe" => Ok(WhisperModel::Gpt4oTranscribe),
            "gpt-4o-mini-transcribe" => Ok(WhisperModel::Gpt4oMiniTranscribe),
            _ => Err(format!("Unknown Whisper model: {}", s)),
        }
    }
}

/// OpenAI Whisper API client.
///
/// Holds one `reqwest::Client`, so a single instance can serve concurrent
/// requests.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: WhisperModel,
    prompt: Option<String>,
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            model: WhisperModel::default(),
            prompt: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: WhisperModel) -> Self {
        self.model = model;
        self
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a prompt for vocabulary hints (max 224 tokens).
    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = Some(prompt);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path, language_hint: &str) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.as_str())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if !language_hint.is_empty() {
            form = form.text("language", language_hint.to_string());
        }

        if let Some(ref prompt) = self.prompt {
            form = form.text("prompt", prompt.clone());
        }

        Ok(form)
    }

    async fn call_api(&self, form: Form) -> Result<WhisperResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            let parsed: WhisperResponse = serde_json::from_str(&body)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(BisubError::Api(format!(
                "Whisper API error: {} ({})",
                api_error.error.message, api_error.error.r#type
            )));
        }

        Err(BisubError::Api(format!(
            "Whisper API error ({}): {}",
            status, error_body
        )))
    }

    /// Convert a Whisper response into engine-order utterances, relative to
    /// the chunk start.
    fn parse_response(response: WhisperResponse, chunk_duration: f64) -> Transcript {
        let utterances = match response.segments {
            Some(segments) => segments
                .into_iter()
                .map(|seg| Utterance::new(seg.start, seg.end, seg.text))
                .collect(),
            // No segment list: one cue spanning the reported duration.
            None if !response.text.trim().is_empty() => vec![Utterance::new(
                0.0,
                response.duration.unwrap_or(chunk_duration),
                response.text,
            )],
            None => Vec::new(),
        };

        Transcript {
            utterances,
            language: response.language,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, chunk: &AudioChunk, language_hint: &str) -> Result<Transcript> {
        debug!("Transcribing chunk {} {:?} with Whisper", chunk.index, chunk.path);

        let metadata = fs::metadata(&chunk.path).await?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(BisubError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let form = self.build_form(&chunk.path, language_hint).await?;
        let response = self.call_api(form).await?;
        let transcript = Self::parse_response(response, chunk.region.duration().as_secs_f64());

        debug!("Whisper returned {} utterances", transcript.utterances.len());

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn is_ready(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}

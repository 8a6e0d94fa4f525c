use crate::error::{BisubError, Result};
use crate::transcribe::WhisperModel;
use crate::translate::libretranslate::DEFAULT_SERVER;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which translation engine to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorProvider {
    #[default]
    Gemini,
    LibreTranslate,
}

impl std::fmt::Display for TranslatorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslatorProvider::Gemini => write!(f, "gemini"),
            TranslatorProvider::LibreTranslate => write!(f, "libretranslate"),
        }
    }
}

impl std::str::FromStr for TranslatorProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(TranslatorProvider::Gemini),
            "libretranslate" => Ok(TranslatorProvider::LibreTranslate),
            _ => Err(format!(
                "Unknown translator: {}. Use 'gemini' or 'libretranslate'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub libretranslate_api_key: Option<String>,
    pub libretranslate_url: String,
    pub translator: TranslatorProvider,
    pub whisper_model: WhisperModel,
    /// Vocabulary hint passed to Whisper (names, jargon).
    pub whisper_prompt: Option<String>,
    /// Language hint used when a request does not name one.
    pub source_language: String,
    pub target_language: String,
    /// Concurrent translation calls per request.
    pub concurrency: usize,
    /// Listen address for `bisub serve`.
    pub bind: String,
    /// Largest accepted upload, in megabytes.
    pub max_upload_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            libretranslate_api_key: None,
            libretranslate_url: DEFAULT_SERVER.to_string(),
            translator: TranslatorProvider::default(),
            whisper_model: WhisperModel::default(),
            whisper_prompt: None,
            source_language: "en".to_string(),
            target_language: "si".to_string(),
            concurrency: 4,
            bind: "0.0.0.0:5000".to_string(),
            max_upload_mb: 512,
        }
    }
}

impl Config {
    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_toml(&std::fs::read_to_string(&path)?)?,
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override fields from environment-style variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(key) = lookup("LIBRETRANSLATE_API_KEY") {
            self.libretranslate_api_key = Some(key);
        }
        if let Some(url) = lookup("BISUB_LIBRETRANSLATE_URL") {
            self.libretranslate_url = url;
        }
        if let Some(provider) = lookup("BISUB_TRANSLATOR") {
            if let Ok(p) = provider.parse() {
                self.translator = p;
            }
        }
        if let Some(prompt) = lookup("BISUB_WHISPER_PROMPT") {
            self.whisper_prompt = Some(prompt);
        }
        if let Some(source) = lookup("BISUB_SOURCE_LANGUAGE") {
            self.source_language = source;
        }
        if let Some(target) = lookup("BISUB_TARGET_LANGUAGE") {
            self.target_language = target;
        }
        if let Some(concurrency) = lookup("BISUB_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
        if let Some(bind) = lookup("BISUB_BIND") {
            self.bind = bind;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(BisubError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        match self.translator {
            TranslatorProvider::Gemini => {
                if self.gemini_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    return Err(BisubError::Config(
                        "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey"
                            .to_string(),
                    ));
                }
            }
            TranslatorProvider::LibreTranslate => {
                if self.libretranslate_url.trim().is_empty() {
                    return Err(BisubError::Config(
                        "LibreTranslate server URL is empty".to_string(),
                    ));
                }
            }
        }

        if self.source_language.trim().is_empty() {
            return Err(BisubError::Config("Source language is empty".to_string()));
        }

        if self.target_language.trim().is_empty() {
            return Err(BisubError::Config("Target language is empty".to_string()));
        }

        if self.concurrency == 0 {
            return Err(BisubError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bisub").join("config.toml"))
    }
}

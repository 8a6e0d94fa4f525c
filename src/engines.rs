//! Long-lived collaborator handles, built once at startup and shared
//! read-only by every request.

use crate::audio::{FfmpegDecoder, MediaDecoder};
use crate::config::{Config, TranslatorProvider};
use crate::error::{BisubError, Result};
use crate::transcribe::{Transcriber, WhisperClient};
use crate::translate::{GeminiTranslator, LibreTranslateClient, Translator};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct Engines {
    pub decoder: Arc<dyn MediaDecoder>,
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
}

/// Whether the recognition and translation engines can take calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub transcriber: bool,
    pub translator: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.transcriber && self.translator
    }
}

impl Engines {
    pub fn new(
        decoder: Arc<dyn MediaDecoder>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            decoder,
            transcriber,
            translator,
        }
    }

    /// Build the ffmpeg decoder, Whisper client and configured translator.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(FfmpegDecoder::new()),
            create_transcriber(config)?,
            create_translator(config)?,
        ))
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            transcriber: self.transcriber.is_ready(),
            translator: self.translator.is_ready(),
        }
    }
}

pub fn create_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    let api_key = config.openai_api_key.clone().ok_or_else(|| {
        BisubError::Config(
            "OpenAI API key not set. Set OPENAI_API_KEY environment variable.".to_string(),
        )
    })?;
    let mut client = WhisperClient::new(api_key).with_model(config.whisper_model);
    if let Some(prompt) = config.whisper_prompt.clone().filter(|p| !p.trim().is_empty()) {
        client = client.with_prompt(prompt);
    }
    Ok(Arc::new(client))
}

pub fn create_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    match config.translator {
        TranslatorProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                BisubError::Config(
                    "Gemini API key not set. Set GEMINI_API_KEY environment variable."
                        .to_string(),
                )
            })?;
            Ok(Arc::new(GeminiTranslator::new(api_key)))
        }
        TranslatorProvider::LibreTranslate => Ok(Arc::new(
            LibreTranslateClient::new(config.libretranslate_url.clone())
                .with_api_key(config.libretranslate_api_key.clone()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_config() -> Config {
        Config {
            openai_api_key: Some("sk-test".to_string()),
            gemini_api_key: Some("test-key".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_create_whisper_transcriber() {
        let transcriber = create_transcriber(&keyed_config()).unwrap();
        assert_eq!(transcriber.name(), "OpenAI Whisper");
    }

    #[test]
    fn test_create_transcriber_missing_key() {
        let config = Config {
            openai_api_key: None,
            ..keyed_config()
        };
        assert!(create_transcriber(&config).is_err());
    }

    #[test]
    fn test_create_translators() {
        let gemini = create_translator(&keyed_config()).unwrap();
        assert_eq!(gemini.name(), "gemini");

        let config = Config {
            translator: TranslatorProvider::LibreTranslate,
            gemini_api_key: None,
            ..keyed_config()
        };
        let libre = create_translator(&config).unwrap();
        assert_eq!(libre.name(), "libretranslate");
    }

    #[test]
    fn test_create_gemini_translator_missing_key() {
        let config = Config {
            gemini_api_key: None,
            ..keyed_config()
        };
        assert!(create_translator(&config).is_err());
    }

    #[test]
    fn test_readiness_from_config() {
        let engines = Engines::from_config(&keyed_config()).unwrap();
        assert!(engines.readiness().is_ready());

        let config = Config {
            openai_api_key: Some(String::new()),
            ..keyed_config()
        };
        let engines = Engines::from_config(&config).unwrap();
        let readiness = engines.readiness();
        assert!(!readiness.transcriber);
        assert!(readiness.translator);
        assert!(!readiness.is_ready());
    }
}

//! LibreTranslate client (public or self-hosted servers).

use crate::error::{BisubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SERVER: &str = "https://libretranslate.com";

pub struct LibreTranslateClient {
    client: Client,
    server: String,
    api_key: Option<String>,
}

impl LibreTranslateClient {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server: server.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Public servers accept anonymous calls; hosted plans need a key.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        debug!("LibreTranslate {} -> {} via {}", source_lang, target_lang, self.server);

        let request = TranslateRequest {
            q: text,
            source: source_lang,
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", self.server))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error bodies are JSON too, so parse before checking the status.
        let parsed = serde_json::from_str::<TranslateResponse>(&body);

        if !status.is_success() {
            let detail = parsed
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(BisubError::Api(format!(
                "LibreTranslate error ({}): {}",
                status, detail
            )));
        }

        let parsed = parsed?;
        if let Some(error) = parsed.error {
            return Err(BisubError::Api(format!("LibreTranslate error: {}", error)));
        }

        parsed
            .translated_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BisubError::Translation("LibreTranslate returned no text".to_string()))
    }

    fn name(&self) -> &'static str {
        "libretranslate"
    }

    fn is_ready(&self) -> bool {
        !self.server.is_empty()
    }
}

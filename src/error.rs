use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BisubError {
    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BisubError>;

/// A step of the subtitle pipeline, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Extraction,
    Transcription,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Input => write!(f, "input"),
            Stage::Extraction => write!(f, "extraction"),
            Stage::Transcription => write!(f, "transcription"),
        }
    }
}

/// Terminal failure of a single pipeline request.
///
/// Translation failures never show up here: they are absorbed per segment
/// by the translation stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Internal error during {stage}: {message}")]
    Internal { stage: Stage, message: String },
}

impl PipelineError {
    /// Wrap an unexpected fault with the stage it happened in.
    pub fn internal(stage: Stage, err: impl std::fmt::Display) -> Self {
        PipelineError::Internal {
            stage,
            message: err.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Input(_) => Stage::Input,
            PipelineError::Extraction(_) => Stage::Extraction,
            PipelineError::Transcription(_) => Stage::Transcription,
            PipelineError::Internal { stage, .. } => *stage,
        }
    }

    /// True when the caller sent something unusable (maps to a 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Input(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [Stage::Input, Stage::Extraction, Stage::Transcription] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_pipeline_error_stage() {
        assert_eq!(PipelineError::Input("empty".into()).stage(), Stage::Input);
        assert_eq!(
            PipelineError::Extraction("no audio".into()).stage(),
            Stage::Extraction
        );
        assert_eq!(
            PipelineError::Transcription("no speech".into()).stage(),
            Stage::Transcription
        );
        assert_eq!(
            PipelineError::internal(Stage::Extraction, "disk full").stage(),
            Stage::Extraction
        );
    }

    #[test]
    fn test_only_input_errors_are_client_errors() {
        assert!(PipelineError::Input("empty".into()).is_client_error());
        assert!(!PipelineError::Extraction("x".into()).is_client_error());
        assert!(!PipelineError::Transcription("x".into()).is_client_error());
        assert!(!PipelineError::internal(Stage::Input, "x").is_client_error());
    }

    #[test]
    fn test_internal_error_message() {
        let err = PipelineError::internal(Stage::Extraction, "disk full");
        assert_eq!(
            err.to_string(),
            "Internal error during extraction: disk full"
        );
    }
}

pub mod audio;
pub mod config;
pub mod engines;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod subtitle;
pub mod transcribe;
pub mod translate;

pub use config::Config;
pub use engines::{Engines, Readiness};
pub use error::{BisubError, PipelineError, Result, Stage};
pub use pipeline::{print_summary, Pipeline, PipelineConfig, PipelineMetadata, PipelineResult};
pub use subtitle::{Segment, Track, TrackRole};

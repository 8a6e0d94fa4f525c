pub mod srt;
pub mod timestamp;

pub use srt::serialize;
pub use timestamp::encode;

use serde::Serialize;
use thiserror::Error;

/// Why a cue could not be built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("start must be a non-negative number of seconds, got {0}")]
    InvalidStart(f64),

    #[error("end {end} is before start {start}")]
    EndBeforeStart { start: f64, end: f64 },

    #[error("cue text is empty")]
    EmptyText,
}

/// One timed subtitle cue.
///
/// Fields are private so a `Segment` always holds a finite non-negative
/// start, an end no earlier than the start, and non-empty trimmed text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    start: f64,
    end: f64,
    text: String,
}

impl Segment {
    /// Build a cue, trimming surrounding whitespace from `text`.
    pub fn new(start: f64, end: f64, text: impl AsRef<str>) -> Result<Self, SegmentError> {
        if !start.is_finite() || start < 0.0 {
            return Err(SegmentError::InvalidStart(start));
        }
        if !end.is_finite() || end < start {
            return Err(SegmentError::EndBeforeStart { start, end });
        }
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(SegmentError::EmptyText);
        }
        Ok(Self {
            start,
            end,
            text: text.to_string(),
        })
    }

    /// Same timing, different text. Used to build the aligned target cue.
    pub fn with_text(&self, text: impl AsRef<str>) -> Result<Self, SegmentError> {
        Self::new(self.start, self.end, text)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Which side of the bilingual pair a track is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Source,
    Target,
}

impl std::fmt::Display for TrackRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackRole::Source => write!(f, "source"),
            TrackRole::Target => write!(f, "target"),
        }
    }
}

/// Ordered cues in one language. Order is whatever the producer appended;
/// a track never re-sorts.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    role: TrackRole,
    language: String,
    segments: Vec<Segment>,
}

impl Track {
    pub fn new(role: TrackRole, language: impl Into<String>) -> Self {
        Self::from_segments(role, language, Vec::new())
    }

    pub fn from_segments(
        role: TrackRole,
        language: impl Into<String>,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            role,
            language: language.into(),
            segments,
        }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn role(&self) -> TrackRole {
        self.role
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// End of the last cue, or zero for an empty track.
    pub fn total_duration(&self) -> f64 {
        self.segments.last().map(Segment::end).unwrap_or(0.0)
    }

    /// True when both tracks have the same length and every cue pair shares
    /// its start and end exactly.
    pub fn is_aligned_with(&self, other: &Track) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.start == b.start && a.end == b.end)
    }

    pub fn to_srt(&self) -> String {
        serialize(&self.segments)
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

// SRT subtitle format
use super::timestamp::encode;
use super::Segment;

/// Render segments as SubRip text, numbering cues from 1 in input order.
///
/// Each cue is followed by a blank line; an empty slice renders as `""`.
pub fn serialize(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                encode(segment.start()),
                encode(segment.end()),
                segment.text()
            )
        })
        .collect()
}

pub mod gemini;
pub mod libretranslate;

pub use gemini::GeminiTranslator;
pub use libretranslate::LibreTranslateClient;

use crate::error::Result;
use crate::subtitle::{Segment, Track, TrackRole};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Prefix of the text substituted for a cue whose translation failed.
pub const FALLBACK_PREFIX: &str = "Translation error: ";

/// Text translation engine.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;

    fn name(&self) -> &'static str;

    /// Whether the engine is configured and able to take calls.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Marker text for a failed translation. Always embeds the original.
pub fn fallback_marker(original: &str) -> String {
    format!("{FALLBACK_PREFIX}{original}")
}

/// Run `op` on every item, at most `concurrency` at a time.
///
/// Each item's outcome is independent: one `Err` never cancels or alters its
/// siblings. Results come back in input order regardless of completion order.
pub async fn isolate_each<'a, T, R, E, F, Fut>(
    items: &'a [T],
    concurrency: usize,
    progress: Option<&ProgressBar>,
    op: F,
) -> Vec<std::result::Result<R, E>>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let semaphore = Semaphore::new(concurrency.max(1));
    let mut pending = FuturesUnordered::new();

    for (index, item) in items.iter().enumerate() {
        let semaphore = &semaphore;
        let future = op(item);
        pending.push(async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = semaphore.acquire().await;
            (index, future.await)
        });
    }

    let mut slots: Vec<Option<std::result::Result<R, E>>> =
        std::iter::repeat_with(|| None).take(items.len()).collect();

    while let Some((index, outcome)) = pending.next().await {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        slots[index] = Some(outcome);
    }

    slots.into_iter().flatten().collect()
}

/// Target track plus how many cues fell back to the marker.
#[derive(Debug, Clone)]
pub struct TranslatedTrack {
    pub track: Track,
    pub fallbacks: usize,
}

/// Translation stage: one engine call per cue, failures isolated per cue.
pub struct TranslationStage {
    translator: Arc<dyn Translator>,
    concurrency: usize,
    show_progress: bool,
}

impl TranslationStage {
    pub fn new(translator: Arc<dyn Translator>, concurrency: usize) -> Self {
        Self {
            translator,
            concurrency: concurrency.max(1),
            show_progress: false,
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.show_progress || len == 0 {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    }

    /// Translate every cue of `source` into `target_lang`.
    ///
    /// Never fails as a whole: the output has exactly one cue per source cue
    /// with identical timing, and a cue whose translation errored or came
    /// back empty carries [`fallback_marker`] of its source text.
    pub async fn translate_track(&self, source: &Track, target_lang: &str) -> TranslatedTrack {
        let source_lang = source.language();

        info!(
            "Translating {} segments {} -> {} with {} (concurrency: {})",
            source.len(),
            source_lang,
            target_lang,
            self.translator.name(),
            self.concurrency
        );

        let progress = self.progress_bar(source.len());
        let outcomes = isolate_each(
            source.segments(),
            self.concurrency,
            progress.as_ref(),
            |segment| {
                self.translator
                    .translate(segment.text(), source_lang, target_lang)
            },
        )
        .await;

        if let Some(pb) = progress {
            pb.finish_with_message("Translation complete");
        }

        let mut fallbacks = 0;
        let segments: Vec<Segment> = source
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (segment, outcome))| {
                let translated = outcome
                    .map_err(|e| e.to_string())
                    .and_then(|text| segment.with_text(text).map_err(|e| e.to_string()));

                match translated {
                    Ok(translated) => {
                        debug!("Segment {} translated", index + 1);
                        translated
                    }
                    Err(reason) => {
                        fallbacks += 1;
                        warn!(
                            "Segment {} translation failed, using fallback: {}",
                            index + 1,
                            reason
                        );
                        fallback_segment(segment)
                    }
                }
            })
            .collect();

        if fallbacks > 0 {
            warn!("{} of {} segments fell back to source text", fallbacks, source.len());
        }

        TranslatedTrack {
            track: Track::from_segments(TrackRole::Target, target_lang, segments),
            fallbacks,
        }
    }
}

fn fallback_segment(source: &Segment) -> Segment {
    // The marker prefix is non-empty, so rebuilding cannot hit EmptyText.
    source
        .with_text(fallback_marker(source.text()))
        .unwrap_or_else(|_| source.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BisubError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Wraps text in brackets; fails for configured inputs; later cues finish
    /// first so completion order differs from input order.
    struct BracketTranslator {
        fail_on: HashSet<String>,
        empty_on: HashSet<String>,
        calls: AtomicUsize,
    }

    impl BracketTranslator {
        fn new() -> Self {
            Self {
                fail_on: HashSet::new(),
                empty_on: HashSet::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(text: &str) -> Self {
            let mut translator = Self::new();
            translator.fail_on.insert(text.to_string());
            translator
        }
    }

    #[async_trait]
    impl Translator for BracketTranslator {
        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20u64.saturating_sub(call as u64 * 5))).await;

            if self.fail_on.contains(text) {
                return Err(BisubError::Translation("quota exceeded".to_string()));
            }
            if self.empty_on.contains(text) {
                return Ok("   ".to_string());
            }
            Ok(format!("[{}]", text))
        }

        fn name(&self) -> &'static str {
            "bracket"
        }
    }

    fn source_track(texts: &[&str]) -> Track {
        let segments = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Segment::new(i as f64 * 2.0, i as f64 * 2.0 + 1.5, t).unwrap())
            .collect();
        Track::from_segments(TrackRole::Source, "en", segments)
    }

    #[tokio::test]
    async fn test_translate_track_preserves_length_and_timing() {
        let stage = TranslationStage::new(Arc::new(BracketTranslator::new()), 4);
        let source = source_track(&["one", "two", "three", "four", "five"]);

        let translated = stage.translate_track(&source, "si").await;

        assert_eq!(translated.fallbacks, 0);
        assert_eq!(translated.track.role(), TrackRole::Target);
        assert_eq!(translated.track.language(), "si");
        assert!(source.is_aligned_with(&translated.track));
        let texts: Vec<&str> = translated.track.iter().map(Segment::text).collect();
        assert_eq!(texts, vec!["[one]", "[two]", "[three]", "[four]", "[five]"]);
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let translator = Arc::new(BracketTranslator::failing_on("two"));
        let stage = TranslationStage::new(translator.clone(), 2);
        let source = source_track(&["one", "two", "three"]);

        let translated = stage.translate_track(&source, "si").await;

        assert_eq!(translated.fallbacks, 1);
        assert_eq!(translated.track.len(), 3);
        assert_eq!(translated.track.segments()[0].text(), "[one]");
        assert_eq!(translated.track.segments()[1].text(), "Translation error: two");
        assert_eq!(translated.track.segments()[2].text(), "[three]");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 3);
        assert!(source.is_aligned_with(&translated.track));
    }

    #[tokio::test]
    async fn test_empty_translation_falls_back() {
        let mut translator = BracketTranslator::new();
        translator.empty_on.insert("silent".to_string());
        let stage = TranslationStage::new(Arc::new(translator), 1);

        let translated = stage.translate_track(&source_track(&["silent"]), "si").await;

        assert_eq!(translated.fallbacks, 1);
        assert_eq!(translated.track.segments()[0].text(), "Translation error: silent");
    }

    #[tokio::test]
    async fn test_empty_track() {
        let stage = TranslationStage::new(Arc::new(BracketTranslator::new()), 4);
        let translated = stage
            .translate_track(&Track::new(TrackRole::Source, "en"), "si")
            .await;

        assert!(translated.track.is_empty());
        assert_eq!(translated.fallbacks, 0);
    }

    #[test]
    fn test_isolate_each_orders_by_index() {
        let items = vec![30u64, 10, 20, 0];
        let results: Vec<std::result::Result<u64, String>> =
            tokio_test::block_on(isolate_each(&items, 4, None, |delay| async move {
                tokio::time::sleep(Duration::from_millis(*delay)).await;
                if *delay == 20 {
                    Err("twenty".to_string())
                } else {
                    Ok(*delay)
                }
            }));

        assert_eq!(
            results,
            vec![Ok(30), Ok(10), Err("twenty".to_string()), Ok(0)]
        );
    }

    #[test]
    fn test_fallback_marker_embeds_original() {
        assert_eq!(fallback_marker("Hello"), "Translation error: Hello");
    }
}

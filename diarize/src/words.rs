//! Word-granularity analysis over transcript words and audio windows.
//!
//! Words come from the recognizer when it produced word timings, or from an
//! even split of the segment otherwise. Feature extraction touches one audio
//! window per word and is embarrassingly parallel; clustering stays
//! sequential because every assignment depends on the profiles built so far.

use std::thread;

use tracing::{debug, warn};

use crate::audio::AudioSource;
use crate::clusterer::{CancelFlag, ClustererConfig, Clustering, OnlineClusterer};
use crate::features::{FeatureConfig, FeatureExtractor, FeatureVector};
use crate::span::{norm_confidence, TimedSpan, WordSpan};

/// Flattens spans into a single time-ordered word list.
///
/// Recognizer-provided words are trimmed and empty ones dropped. Spans
/// without word detail are split evenly across their duration, one slot per
/// whitespace-separated token, carrying the span confidence as the word
/// probability.
pub fn flatten_words(spans: &[TimedSpan]) -> Vec<WordSpan> {
    let mut out = Vec::new();
    for span in spans {
        if span.words.is_empty() {
            synthesize_words(span, &mut out);
            continue;
        }
        for w in &span.words {
            let word = w.word.trim();
            if word.is_empty() {
                continue;
            }
            out.push(WordSpan::new(word, w.start, w.end, w.probability));
        }
    }
    out
}

fn synthesize_words(span: &TimedSpan, out: &mut Vec<WordSpan>) {
    let tokens: Vec<&str> = span.text.split_whitespace().collect();
    if tokens.is_empty() {
        return;
    }
    let probability = norm_confidence(span.confidence);
    let step = span.duration() / tokens.len() as f64;
    for (i, token) in tokens.iter().enumerate() {
        out.push(WordSpan::new(
            *token,
            span.start + step * i as f64,
            span.start + step * (i + 1) as f64,
            probability,
        ));
    }
}

/// Clusters transcripts word by word using audio-derived features.
///
/// The most precise strategy and the only one that needs the recording
/// itself. Produces one labeled span per word; grouping consecutive words of
/// one speaker back into utterances is left to presentation code.
#[derive(Debug, Clone)]
pub struct WordLevelAnalyzer {
    extractor: FeatureExtractor,
    clusterer: ClustererConfig,
    sample_rate: u32,
}

impl WordLevelAnalyzer {
    pub fn new(features: FeatureConfig, clusterer: ClustererConfig, sample_rate: u32) -> Self {
        Self {
            extractor: FeatureExtractor::new(features),
            clusterer,
            sample_rate,
        }
    }

    /// Runs word-level clustering over the spans.
    ///
    /// Words whose audio window cannot be fetched degrade to neutral
    /// features and attach to the surrounding speaker instead of failing
    /// the pass. Cancellation is honored between words; a cancelled run
    /// returns whatever was assigned so far.
    pub fn analyze(
        &self,
        spans: &[TimedSpan],
        source: &dyn AudioSource,
        cancel: &CancelFlag,
    ) -> Clustering {
        let words = flatten_words(spans);
        if words.is_empty() {
            return Clustering::default();
        }
        debug!(words = words.len(), "word-level analysis");
        let features = self.extract_all(&words, source, cancel);

        let mut clusterer = OnlineClusterer::new(self.clusterer.clone());
        for (word, v) in words.iter().zip(features.iter()) {
            if cancel.is_cancelled() {
                break;
            }
            clusterer.push(&word.word, word.start, word.end, word.probability, Some(v));
        }
        clusterer.finish()
    }

    /// Extracts one feature vector per word, fanning the words out over the
    /// available cores. Output order always matches input order.
    fn extract_all(
        &self,
        words: &[WordSpan],
        source: &dyn AudioSource,
        cancel: &CancelFlag,
    ) -> Vec<FeatureVector> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .min(words.len());
        if workers <= 1 {
            return words
                .iter()
                .map(|w| self.extract_one(w, source, cancel))
                .collect();
        }

        let chunk_len = words.len().div_ceil(workers);
        let mut features = vec![FeatureVector::neutral(); words.len()];
        thread::scope(|scope| {
            for (wchunk, fchunk) in words.chunks(chunk_len).zip(features.chunks_mut(chunk_len)) {
                scope.spawn(move || {
                    for (w, slot) in wchunk.iter().zip(fchunk.iter_mut()) {
                        *slot = self.extract_one(w, source, cancel);
                    }
                });
            }
        });
        features
    }

    fn extract_one(
        &self,
        word: &WordSpan,
        source: &dyn AudioSource,
        cancel: &CancelFlag,
    ) -> FeatureVector {
        if cancel.is_cancelled() {
            return FeatureVector::neutral();
        }
        match source.samples(word.start, word.end, self.sample_rate) {
            Ok(samples) => self.extractor.extract_from_audio(
                &word.word,
                word.start,
                word.end,
                &samples,
                self.sample_rate,
            ),
            Err(e) => {
                warn!(
                    word = %word.word,
                    start = word.start,
                    error = %e,
                    "audio window failed, neutral features"
                );
                FeatureVector::neutral()
            }
        }
    }
}

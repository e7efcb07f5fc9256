//! Strategy selection and the end-to-end diarization run.
//!
//! A run tries each configured strategy in order and keeps the first one
//! that produces speaker profiles. Word-level clustering needs the audio and
//! is skipped without it; the single-speaker assignment is the unconditional
//! last resort so a transcript never comes back unlabeled.

use std::fmt;

use serde::Serialize;
use talkturn_labels::speaker_label;
use tracing::{debug, info};

use crate::audio::AudioSource;
use crate::clusterer::{CancelFlag, ClustererConfig, Clustering, OnlineClusterer, CONFIDENCE_FLOOR};
use crate::error::DiarizeError;
use crate::features::{FeatureConfig, FeatureExtractor};
use crate::merge::merge_profiles;
use crate::profile::SpeakerId;
use crate::similarity::Metric;
use crate::span::{norm_confidence, validate, LabeledSpan, TimedSpan};
use crate::words::WordLevelAnalyzer;

/// One way of assigning speakers to spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Per-word clustering over audio-derived features. Needs the recording.
    WordLevel,
    /// Segment clustering where every span scores against every profile.
    EnhancedSegment,
    /// Segment clustering gated on inter-span pauses.
    BasicSegment,
    /// Everything goes to speaker 1.
    SingleSpeaker,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::WordLevel => "word-level",
            Strategy::EnhancedSegment => "enhanced-segment",
            Strategy::BasicSegment => "basic-segment",
            Strategy::SingleSpeaker => "single-speaker",
        };
        f.write_str(name)
    }
}

/// Tuning for a diarization run.
#[derive(Debug, Clone)]
pub struct DiarizeConfig {
    /// Language code for display labels; "auto" and unknown codes fall back
    /// to English (default: "auto").
    pub language: String,
    /// Sample rate audio windows are fetched at (default: 16000).
    pub sample_rate: u32,
    /// Feature extraction tuning shared by all strategies.
    pub features: FeatureConfig,
    /// Strategies tried in order until one yields speaker profiles.
    pub strategies: Vec<Strategy>,
}

impl Default for DiarizeConfig {
    fn default() -> Self {
        Self {
            language: "auto".to_string(),
            sample_rate: 16000,
            features: FeatureConfig::default(),
            strategies: vec![
                Strategy::WordLevel,
                Strategy::EnhancedSegment,
                Strategy::BasicSegment,
            ],
        }
    }
}

/// Result of a diarization run.
#[derive(Debug, Clone, Serialize)]
pub struct Diarization {
    /// The strategy that produced the assignment.
    pub strategy: Strategy,
    /// Labeled spans in input order. Word-level runs emit one span per word.
    pub spans: Vec<LabeledSpan>,
    /// Number of distinct speakers after merging.
    pub speakers: usize,
    /// True when the run was cancelled and the spans are a prefix of the
    /// full assignment, unmerged.
    pub cancelled: bool,
}

/// Runs the configured strategy chain over a transcript.
#[derive(Debug, Clone, Default)]
pub struct Diarizer {
    cfg: DiarizeConfig,
}

impl Diarizer {
    pub fn new(cfg: DiarizeConfig) -> Self {
        Self { cfg }
    }

    /// Assigns a speaker to every span of the transcript.
    ///
    /// Fails only on malformed input (a span or word with inverted timing);
    /// everything else degrades through the strategy chain down to the
    /// single-speaker assignment. Cancellation returns the partial
    /// assignment built so far with `cancelled` set.
    pub fn diarize(
        &self,
        spans: &[TimedSpan],
        audio: Option<&dyn AudioSource>,
        cancel: &CancelFlag,
    ) -> Result<Diarization, DiarizeError> {
        validate(spans)?;

        for &strategy in &self.cfg.strategies {
            let clustering = match strategy {
                Strategy::WordLevel => {
                    let Some(source) = audio else {
                        debug!("no audio available, skipping word-level pass");
                        continue;
                    };
                    let analyzer = WordLevelAnalyzer::new(
                        self.cfg.features.clone(),
                        ClustererConfig::word(),
                        self.cfg.sample_rate,
                    );
                    analyzer.analyze(spans, source, cancel)
                }
                Strategy::EnhancedSegment => {
                    self.run_segments(spans, ClustererConfig::enhanced_segment(), cancel)
                }
                Strategy::BasicSegment => {
                    self.run_segments(spans, ClustererConfig::basic_segment(), cancel)
                }
                Strategy::SingleSpeaker => {
                    return Ok(single_speaker(spans, &self.cfg.language));
                }
            };

            if cancel.is_cancelled() {
                let mut partial = clustering;
                partial.relabel(&self.cfg.language);
                info!(
                    strategy = %strategy,
                    spans = partial.spans.len(),
                    "diarization cancelled, returning partial assignment"
                );
                return Ok(Diarization {
                    strategy,
                    speakers: partial.profiles.len(),
                    spans: partial.spans,
                    cancelled: true,
                });
            }

            if clustering.profiles.is_empty() {
                debug!(strategy = %strategy, "no speaker profiles, trying next strategy");
                continue;
            }

            let mut merged = merge_profiles(clustering, &merge_metric(strategy));
            merged.relabel(&self.cfg.language);
            info!(
                strategy = %strategy,
                speakers = merged.profiles.len(),
                spans = merged.spans.len(),
                "diarization complete"
            );
            return Ok(Diarization {
                strategy,
                speakers: merged.profiles.len(),
                spans: merged.spans,
                cancelled: false,
            });
        }

        Ok(single_speaker(spans, &self.cfg.language))
    }

    /// Sequential segment pass: extract, then cluster, one span at a time.
    fn run_segments(
        &self,
        spans: &[TimedSpan],
        cfg: ClustererConfig,
        cancel: &CancelFlag,
    ) -> Clustering {
        let extractor = FeatureExtractor::new(self.cfg.features.clone());
        let mut clusterer = OnlineClusterer::new(cfg);
        for span in spans {
            if cancel.is_cancelled() {
                break;
            }
            match extractor.extract(span) {
                Ok(v) => {
                    clusterer.push(&span.text, span.start, span.end, span.confidence, Some(&v))
                }
                Err(_) => clusterer.push(&span.text, span.start, span.end, span.confidence, None),
            };
        }
        clusterer.finish()
    }
}

fn merge_metric(strategy: Strategy) -> Metric {
    match strategy {
        Strategy::WordLevel => Metric::word(),
        _ => Metric::segment(),
    }
}

/// Assigns every span with text to speaker 1.
///
/// The unconditional fallback for transcripts where no strategy found a
/// voice to cluster, and directly selectable for callers that only want
/// consistent labels.
pub fn single_speaker(spans: &[TimedSpan], language: &str) -> Diarization {
    let label = speaker_label(language, 1);
    let out: Vec<LabeledSpan> = spans
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| LabeledSpan {
            text: s.text.clone(),
            start: s.start,
            end: s.end,
            speaker: SpeakerId(1),
            label: label.clone(),
            confidence: norm_confidence(s.confidence).max(CONFIDENCE_FLOOR),
        })
        .collect();
    let speakers = if out.is_empty() { 0 } else { 1 };
    Diarization {
        strategy: Strategy::SingleSpeaker,
        spans: out,
        speakers,
        cancelled: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmClip;
    use crate::span::WordSpan;
    use std::f64::consts::PI;

    /// ~1 w/s measured delivery, low confidence.
    fn slow_span(text: &str, start: f64) -> TimedSpan {
        TimedSpan::new(text, start, start + 4.0, -0.8)
    }

    /// ~4 w/s measured delivery, high confidence.
    fn fast_span(text: &str, start: f64) -> TimedSpan {
        TimedSpan::new(text, start, start + 2.0, 0.9)
    }

    fn mixed_transcript() -> Vec<TimedSpan> {
        vec![
            slow_span("one two three four", 0.0),
            fast_span("quick brisk speech now really fast words here", 4.5),
            slow_span("one two three four", 7.0),
        ]
    }

    #[test]
    fn falls_back_to_enhanced_segments_without_audio() {
        let diarizer = Diarizer::new(DiarizeConfig::default());
        let out = diarizer
            .diarize(&mixed_transcript(), None, &CancelFlag::new())
            .unwrap();

        assert_eq!(out.strategy, Strategy::EnhancedSegment);
        assert_eq!(out.speakers, 2);
        assert_eq!(out.spans.len(), 3);
        assert_eq!(out.spans[0].speaker, out.spans[2].speaker);
        assert_ne!(out.spans[0].speaker, out.spans[1].speaker);
        assert!(!out.cancelled);
    }

    fn sine(freq: f64, amp: f64, samples: usize, rate: u32) -> Vec<i16> {
        (0..samples)
            .map(|i| {
                let t = i as f64 / rate as f64;
                ((freq * 2.0 * PI * t).sin() * amp) as i16
            })
            .collect()
    }

    #[test]
    fn word_level_wins_when_audio_is_present() {
        let rate = 16000u32;
        let mut samples = sine(100.0, 2000.0, 16000, rate);
        samples.extend(sine(380.0, 30000.0, 16000, rate));
        let clip = PcmClip::new(samples, rate);

        let mut a = TimedSpan::new("low tone", 0.0, 1.0, -0.2);
        a.words.push(WordSpan::new("low", 0.05, 0.45, 0.9));
        a.words.push(WordSpan::new("tone", 0.5, 0.9, 0.9));
        let mut b = TimedSpan::new("high tone", 1.0, 2.0, -0.2);
        b.words.push(WordSpan::new("high", 1.05, 1.45, 0.9));
        b.words.push(WordSpan::new("tone", 1.5, 1.9, 0.9));

        let diarizer = Diarizer::new(DiarizeConfig::default());
        let out = diarizer
            .diarize(&[a, b], Some(&clip), &CancelFlag::new())
            .unwrap();

        assert_eq!(out.strategy, Strategy::WordLevel);
        assert_eq!(out.speakers, 2);
        assert_eq!(out.spans.len(), 4);
        assert_eq!(out.spans[0].speaker, out.spans[1].speaker);
        assert_ne!(out.spans[1].speaker, out.spans[2].speaker);
    }

    #[test]
    fn pre_cancelled_run_returns_partial() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let diarizer = Diarizer::new(DiarizeConfig::default());
        let out = diarizer
            .diarize(&mixed_transcript(), None, &cancel)
            .unwrap();

        assert!(out.cancelled);
        assert!(out.spans.is_empty());
        assert_eq!(out.strategy, Strategy::EnhancedSegment);
    }

    #[test]
    fn empty_input_is_ok_and_empty() {
        let diarizer = Diarizer::new(DiarizeConfig::default());
        let out = diarizer.diarize(&[], None, &CancelFlag::new()).unwrap();
        assert_eq!(out.strategy, Strategy::SingleSpeaker);
        assert!(out.spans.is_empty());
        assert_eq!(out.speakers, 0);
    }

    #[test]
    fn malformed_span_fails_the_whole_run() {
        let spans = vec![
            TimedSpan::new("fine", 0.0, 1.0, 0.9),
            TimedSpan::new("inverted", 5.0, 4.0, 0.9),
        ];
        let diarizer = Diarizer::new(DiarizeConfig::default());
        let err = diarizer
            .diarize(&spans, None, &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, DiarizeError::MalformedSpan { index: 1, .. }));
    }

    #[test]
    fn blank_transcript_falls_through_to_empty_single_speaker() {
        let spans = vec![
            TimedSpan::new("", 0.0, 1.0, 0.9),
            TimedSpan::new("   ", 1.0, 2.0, 0.9),
        ];
        let diarizer = Diarizer::new(DiarizeConfig::default());
        let out = diarizer.diarize(&spans, None, &CancelFlag::new()).unwrap();
        assert_eq!(out.strategy, Strategy::SingleSpeaker);
        assert!(out.spans.is_empty());
        assert_eq!(out.speakers, 0);
    }

    #[test]
    fn forced_single_speaker_labels_in_language() {
        let cfg = DiarizeConfig {
            language: "de".to_string(),
            strategies: vec![Strategy::SingleSpeaker],
            ..DiarizeConfig::default()
        };
        let out = Diarizer::new(cfg)
            .diarize(&mixed_transcript(), None, &CancelFlag::new())
            .unwrap();

        assert_eq!(out.strategy, Strategy::SingleSpeaker);
        assert_eq!(out.speakers, 1);
        assert_eq!(out.spans.len(), 3);
        assert!(out.spans.iter().all(|s| s.label == "Sprecher 1"));
    }

    #[test]
    fn basic_only_chain_segments_on_pauses() {
        let cfg = DiarizeConfig {
            strategies: vec![Strategy::BasicSegment],
            ..DiarizeConfig::default()
        };
        let out = Diarizer::new(cfg)
            .diarize(&mixed_transcript(), None, &CancelFlag::new())
            .unwrap();

        assert_eq!(out.strategy, Strategy::BasicSegment);
        assert_eq!(out.speakers, 2);
    }

    #[test]
    fn strategy_names_are_stable() {
        assert_eq!(Strategy::WordLevel.to_string(), "word-level");
        assert_eq!(Strategy::SingleSpeaker.to_string(), "single-speaker");
        let json = serde_json::to_string(&Strategy::EnhancedSegment).unwrap();
        assert_eq!(json, "\"enhanced-segment\"");
    }
}

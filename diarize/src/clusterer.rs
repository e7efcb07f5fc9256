//! Online nearest-centroid clustering of spans into speaker profiles.
//!
//! One clusterer serves every granularity; [`ClustererConfig`] selects the
//! metric, the match threshold, and whether speaker changes are gated on an
//! inter-span pause. Spans are consumed strictly in time order because each
//! assignment depends on the profile state left by all prior spans.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use talkturn_labels::speaker_label;
use tracing::debug;

use crate::features::FeatureVector;
use crate::profile::{SpeakerId, SpeakerProfile};
use crate::similarity::Metric;
use crate::span::{norm_confidence, LabeledSpan};

/// Lowest confidence ever emitted for a span that did not match a profile.
pub(crate) const CONFIDENCE_FLOOR: f64 = 0.3;

/// Tuning for one clustering pass.
#[derive(Debug, Clone)]
pub struct ClustererConfig {
    /// How feature vectors are compared.
    pub metric: Metric,
    /// Similarity above which a span matches an existing profile.
    pub match_threshold: f64,
    /// When set, a speaker change is only considered after an inter-span
    /// pause longer than this many seconds; shorter gaps keep the current
    /// speaker regardless of drift.
    pub change_gap: Option<f64>,
    /// Spans with fewer words than this are attached to the current speaker
    /// without touching profile statistics.
    pub min_words: usize,
    /// How many recent vectors of the current speaker form the rolling
    /// reference the gap-gated variant compares against.
    pub rolling_window: usize,
}

impl ClustererConfig {
    /// Conservative segment clustering: changes need both a pause longer
    /// than 0.3s and a voice drifted below 0.75 similarity from the rolling
    /// reference, and spans under two words never influence profiles.
    pub fn basic_segment() -> Self {
        Self {
            metric: Metric::segment(),
            match_threshold: 0.75,
            change_gap: Some(0.3),
            min_words: 2,
            rolling_window: 3,
        }
    }

    /// Profile-matching segment clustering: every span scores against every
    /// profile, best similarity above 0.70 wins.
    pub fn enhanced_segment() -> Self {
        Self {
            metric: Metric::segment(),
            match_threshold: 0.70,
            change_gap: None,
            min_words: 1,
            rolling_window: 3,
        }
    }

    /// Word-granularity clustering over audio-derived vectors.
    pub fn word() -> Self {
        Self {
            metric: Metric::word(),
            ..Self::enhanced_segment()
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running pass.
///
/// Clones observe the same flag. Drivers check it between spans, never
/// mid-span, so a cancelled run still ends on a span boundary with fully
/// consistent profiles for everything processed so far.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Output of a clustering pass.
///
/// Span labels default to English; [`Clustering::relabel`] localizes them
/// once merging has settled the final ids.
#[derive(Debug, Clone, Default)]
pub struct Clustering {
    pub spans: Vec<LabeledSpan>,
    pub profiles: Vec<SpeakerProfile>,
}

impl Clustering {
    /// Rewrites every span's display label for the given language code.
    pub fn relabel(&mut self, language: &str) {
        for s in &mut self.spans {
            s.label = speaker_label(language, s.speaker.0);
        }
    }
}

/// Incremental clusterer: feed spans in time order, then [`finish`].
///
/// [`finish`]: OnlineClusterer::finish
pub struct OnlineClusterer {
    cfg: ClustererConfig,
    profiles: Vec<SpeakerProfile>,
    spans: Vec<LabeledSpan>,
    /// Index into `profiles` of the currently active speaker.
    current: Option<usize>,
    /// Recent vectors assigned to the current speaker; reset on change.
    rolling: VecDeque<FeatureVector>,
    /// End of the last feature-bearing span, for pause measurement.
    last_end: f64,
}

impl OnlineClusterer {
    pub fn new(cfg: ClustererConfig) -> Self {
        Self {
            cfg,
            profiles: Vec::new(),
            spans: Vec::new(),
            current: None,
            rolling: VecDeque::new(),
            last_end: 0.0,
        }
    }

    /// Assigns one span to a speaker and records it.
    ///
    /// Spans without usable features (`None`, a neutral vector, or fewer
    /// than `min_words` words) attach to the current speaker without
    /// becoming profile samples; their text is never dropped.
    pub fn push(
        &mut self,
        text: &str,
        start: f64,
        end: f64,
        confidence: f64,
        features: Option<&FeatureVector>,
    ) -> SpeakerId {
        let word_count = text.split_whitespace().count();
        let v = match features {
            Some(v) if !v.is_neutral() && word_count >= self.cfg.min_words => v,
            _ => return self.attach(text, start, end, confidence),
        };

        let (idx, match_sim) = if self.profiles.is_empty() {
            // First feature-bearing span establishes speaker 1.
            (self.create_profile(), None)
        } else if let Some(gap_threshold) = self.cfg.change_gap {
            self.assign_gated(v, start, gap_threshold)
        } else {
            self.assign_ungated(v)
        };

        self.profiles[idx].add_sample(v.clone());
        if self.current == Some(idx) {
            self.rolling.push_back(v.clone());
            while self.rolling.len() > self.cfg.rolling_window {
                self.rolling.pop_front();
            }
        } else {
            self.rolling.clear();
            self.rolling.push_back(v.clone());
        }
        self.current = Some(idx);
        self.last_end = end;

        let id = self.profiles[idx].id;
        let span_confidence = match match_sim {
            Some(sim) => sim.clamp(0.0, 1.0),
            None => norm_confidence(confidence).max(CONFIDENCE_FLOOR),
        };
        self.emit(text, start, end, id, span_confidence);
        id
    }

    /// Consumes the clusterer and returns everything assigned so far.
    pub fn finish(self) -> Clustering {
        Clustering {
            spans: self.spans,
            profiles: self.profiles,
        }
    }

    /// Number of profiles created so far.
    pub fn speaker_count(&self) -> usize {
        self.profiles.len()
    }

    /// Pause-gated assignment: keep the current speaker on short gaps or
    /// close voices, otherwise rematch against all profiles.
    fn assign_gated(
        &mut self,
        v: &FeatureVector,
        start: f64,
        gap_threshold: f64,
    ) -> (usize, Option<f64>) {
        let Some(cur) = self.current else {
            return (self.create_profile(), None);
        };

        let gap = start - self.last_end;
        let reference = self.rolling_centroid(cur);
        let sim = self.cfg.metric.similarity(&reference, v);
        if gap <= gap_threshold || sim >= self.cfg.match_threshold {
            return (cur, Some(sim));
        }

        let (best, best_sim) = self.best_profile(v);
        if best_sim > self.cfg.match_threshold {
            debug!(
                speaker = %self.profiles[best].id,
                similarity = best_sim,
                at = start,
                "returning speaker"
            );
            (best, Some(best_sim))
        } else {
            debug!(gap, similarity = sim, at = start, "speaker change");
            (self.create_profile(), None)
        }
    }

    /// Ungated assignment: best profile wins if it clears the threshold.
    fn assign_ungated(&mut self, v: &FeatureVector) -> (usize, Option<f64>) {
        let (best, best_sim) = self.best_profile(v);
        if best_sim > self.cfg.match_threshold {
            (best, Some(best_sim))
        } else {
            (self.create_profile(), None)
        }
    }

    fn best_profile(&self, v: &FeatureVector) -> (usize, f64) {
        let mut best = 0usize;
        let mut best_sim = -1.0f64;
        for (i, p) in self.profiles.iter().enumerate() {
            let sim = p.match_probability(&self.cfg.metric, v);
            if sim > best_sim {
                best = i;
                best_sim = sim;
            }
        }
        (best, best_sim)
    }

    /// Mean of the rolling window, or the profile centroid while the window
    /// is empty.
    fn rolling_centroid(&self, profile_idx: usize) -> FeatureVector {
        if self.rolling.is_empty() {
            return self.profiles[profile_idx].centroid.clone();
        }
        let mut c = FeatureVector::neutral();
        for v in &self.rolling {
            c.accumulate(v);
        }
        c.scale(1.0 / self.rolling.len() as f64);
        c
    }

    fn create_profile(&mut self) -> usize {
        let id = SpeakerId(self.profiles.len() as u32 + 1);
        debug!(speaker = %id, "created speaker profile");
        self.profiles.push(SpeakerProfile::new(id));
        self.profiles.len() - 1
    }

    /// Labels a span with the current speaker without sampling it. The gap
    /// clock also stays untouched so the pause is measured between
    /// feature-bearing spans.
    fn attach(&mut self, text: &str, start: f64, end: f64, confidence: f64) -> SpeakerId {
        let id = self
            .current
            .map(|i| self.profiles[i].id)
            .unwrap_or(SpeakerId(1));
        debug!(speaker = %id, at = start, "span below clustering threshold, attached");
        self.emit(
            text,
            start,
            end,
            id,
            norm_confidence(confidence).max(CONFIDENCE_FLOOR),
        );
        id
    }

    fn emit(&mut self, text: &str, start: f64, end: f64, id: SpeakerId, confidence: f64) {
        self.spans.push(LabeledSpan {
            text: text.to_string(),
            start,
            end,
            speaker: id,
            label: speaker_label("en", id.0),
            confidence,
        });
    }
}

//! Distance and similarity between feature vectors.
//!
//! One metric serves both granularities. Segment vectors compare on the four
//! text-derived components with per-component relative differences; word
//! vectors compare on the full acoustic set with a cepstrum-dominated
//! Euclidean distance. Both map onto a similarity in [0, 1] where 1 means
//! identical, so every clustering threshold reads as similarity-to-match.

use crate::features::FeatureVector;

/// Which components a comparison weighs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Pitch 0.35, energy 0.15, speaking rate 0.25, pause ratio 0.25.
    Segment,
    /// Cepstrum dominated, with pitch, energy, and formant terms.
    Word,
}

/// Compares feature vectors.
#[derive(Debug, Clone)]
pub struct Metric {
    pub weighting: Weighting,
    /// Guard for relative differences when both magnitudes vanish
    /// (default: 1e-9).
    pub epsilon: f64,
    /// Decay constant mapping word distances onto similarities
    /// (default: 14.0, placing the match cutoff near 0.70).
    pub word_decay: f64,
}

impl Metric {
    /// Segment-granularity metric.
    pub fn segment() -> Self {
        Self {
            weighting: Weighting::Segment,
            epsilon: 1e-9,
            word_decay: 14.0,
        }
    }

    /// Word-granularity metric.
    pub fn word() -> Self {
        Self {
            weighting: Weighting::Word,
            ..Self::segment()
        }
    }

    /// Distance between two vectors: non-negative, zero for identical
    /// inputs, symmetric. Segment distances live in [0, 1]; word distances
    /// are unbounded.
    pub fn distance(&self, a: &FeatureVector, b: &FeatureVector) -> f64 {
        match self.weighting {
            Weighting::Segment => self.segment_distance(a, b),
            Weighting::Word => self.word_distance(a, b),
        }
    }

    /// Similarity in [0, 1], monotone decreasing in distance: 1 for
    /// identical vectors, toward 0 for very different ones.
    pub fn similarity(&self, a: &FeatureVector, b: &FeatureVector) -> f64 {
        match self.weighting {
            Weighting::Segment => 1.0 - self.segment_distance(a, b),
            Weighting::Word => (-self.word_distance(a, b) / self.word_decay).exp(),
        }
    }

    fn segment_distance(&self, a: &FeatureVector, b: &FeatureVector) -> f64 {
        let pitch = self.rel_diff(a.pitch_hz, b.pitch_hz);
        let energy = self.rel_diff(a.energy, b.energy);
        let rate = self.rel_diff(a.speaking_rate, b.speaking_rate);
        // Pause ratios are small; a fixed floor keeps tiny absolute
        // differences from dominating.
        let pause_norm = a.pause_ratio.max(b.pause_ratio).max(0.5);
        let pause = (a.pause_ratio - b.pause_ratio).abs() / pause_norm;

        pitch * 0.35 + energy * 0.15 + rate * 0.25 + pause * 0.25
    }

    fn word_distance(&self, a: &FeatureVector, b: &FeatureVector) -> f64 {
        let mut d = 0.0f64;
        for (ca, cb) in a.cepstrum.iter().zip(b.cepstrum.iter()) {
            d += (ca - cb).powi(2);
        }
        d += ((a.pitch_hz - b.pitch_hz) / 100.0).powi(2) * 5.0;
        d += self.rel_diff(a.energy, b.energy).powi(2) * 3.0;
        for (fa, fb) in a.formants.iter().zip(b.formants.iter()) {
            d += ((fa - fb) / 1000.0).powi(2) * 2.0;
        }
        d.sqrt()
    }

    /// `|a - b| / max(a, b)`, guarded so two vanishing magnitudes compare
    /// as identical instead of dividing zero by zero.
    fn rel_diff(&self, a: f64, b: f64) -> f64 {
        (a - b).abs() / a.max(b).max(self.epsilon)
    }
}

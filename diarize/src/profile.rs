//! Speaker identities and their running acoustic profiles.

use std::fmt;

use serde::Serialize;

use crate::features::FeatureVector;
use crate::similarity::Metric;

/// Speaker identity, unique within one diarization run.
///
/// Ids are assigned in strictly increasing order of first appearance and
/// renumbered gap-free by the merge pass. They carry no meaning across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeakerId(pub u32);

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Running aggregate of every feature vector assigned to one speaker.
///
/// The centroid is kept equal to the component-wise mean of the history at
/// all times, including after [`SpeakerProfile::absorb`].
#[derive(Debug, Clone)]
pub struct SpeakerProfile {
    pub id: SpeakerId,
    /// Number of vectors accumulated; always equals `history.len()`.
    pub sample_count: usize,
    /// Assigned vectors in assignment order.
    pub history: Vec<FeatureVector>,
    /// Component-wise mean of the history; neutral while empty.
    pub centroid: FeatureVector,
}

impl SpeakerProfile {
    pub fn new(id: SpeakerId) -> Self {
        Self {
            id,
            sample_count: 0,
            history: Vec::new(),
            centroid: FeatureVector::neutral(),
        }
    }

    /// Appends a vector and refreshes the centroid.
    pub fn add_sample(&mut self, v: FeatureVector) {
        self.history.push(v);
        self.sample_count += 1;
        self.recompute_centroid();
    }

    /// Similarity of `v` to this profile's centroid, or 0 for a profile
    /// without samples.
    pub fn match_probability(&self, metric: &Metric, v: &FeatureVector) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        metric.similarity(&self.centroid, v)
    }

    /// Takes over another profile's history, preserving assignment order
    /// within each history, and refreshes the centroid.
    pub fn absorb(&mut self, other: SpeakerProfile) {
        self.sample_count += other.sample_count;
        self.history.extend(other.history);
        self.recompute_centroid();
    }

    fn recompute_centroid(&mut self) {
        let mut c = FeatureVector::neutral();
        for v in &self.history {
            c.accumulate(v);
        }
        if !self.history.is_empty() {
            c.scale(1.0 / self.history.len() as f64);
        }
        self.centroid = c;
    }
}

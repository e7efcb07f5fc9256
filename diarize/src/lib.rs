//! Heuristic speaker diarization for timed transcripts.
//!
//! Assigns a speaker to every span of a transcript using lightweight
//! acoustic features, with no model files and no network.
//!
//! # Architecture
//!
//! A [`Diarizer`] run walks a strategy chain until one sticks:
//!
//! 1. [`Strategy::WordLevel`]: per-word PCM windows -> [`FeatureVector`]s
//!    (parallel) -> online clustering. Needs an [`AudioSource`].
//! 2. [`Strategy::EnhancedSegment`]: segment features from timing and text
//!    alone, every span scored against every profile.
//! 3. [`Strategy::BasicSegment`]: same features, but speaker changes are
//!    gated on inter-span pauses.
//! 4. Single-speaker fallback: everything goes to speaker 1.
//!
//! The winning pass is followed by a profile merge that joins clusters of
//! the same voice and renumbers speakers by first appearance, then labels
//! are localized via `talkturn-labels`.
//!
//! # Example
//!
//! ```
//! use talkturn_diarize::{CancelFlag, DiarizeConfig, Diarizer, TimedSpan};
//!
//! let spans = vec![
//!     TimedSpan::new("well hello there", 0.0, 2.0, -0.3),
//!     TimedSpan::new("hi how are you doing today", 2.5, 4.0, 0.9),
//! ];
//! let diarizer = Diarizer::new(DiarizeConfig::default());
//! let run = diarizer.diarize(&spans, None, &CancelFlag::new())?;
//! assert_eq!(run.spans.len(), 2);
//! # Ok::<(), talkturn_diarize::DiarizeError>(())
//! ```

mod audio;
mod clusterer;
mod error;
mod features;
mod merge;
mod pipeline;
mod profile;
mod similarity;
mod span;
mod words;

pub use audio::{AudioSource, PcmClip};
pub use clusterer::{CancelFlag, ClustererConfig, Clustering, OnlineClusterer};
pub use error::DiarizeError;
pub use features::{FeatureConfig, FeatureExtractor, FeatureVector, CEPSTRUM_LEN, FORMANT_LEN};
pub use merge::{merge_profiles, MERGE_SIMILARITY};
pub use pipeline::{single_speaker, Diarization, DiarizeConfig, Diarizer, Strategy};
pub use profile::{SpeakerId, SpeakerProfile};
pub use similarity::{Metric, Weighting};
pub use span::{norm_confidence, parse_transcript, validate, LabeledSpan, TimedSpan, WordSpan};
pub use words::{flatten_words, WordLevelAnalyzer};

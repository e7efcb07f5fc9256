//! Transcript span data model.
//!
//! [`TimedSpan`] deserializes directly from Whisper-style verbose JSON
//! segments; [`LabeledSpan`] is the serializable output of a diarization run.

use serde::{Deserialize, Serialize};

use crate::error::DiarizeError;
use crate::profile::SpeakerId;

/// One transcribed segment with timing and optional word-level detail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimedSpan {
    /// Transcribed text of the segment.
    #[serde(default)]
    pub text: String,
    /// Segment start in seconds.
    #[serde(default)]
    pub start: f64,
    /// Segment end in seconds.
    #[serde(default)]
    pub end: f64,
    /// Recognizer confidence. Whisper reports `avg_logprob` (a value <= 0);
    /// other producers report a probability in [0, 1]. Both are accepted and
    /// normalized lazily via [`norm_confidence`].
    #[serde(default, alias = "avg_logprob")]
    pub confidence: f64,
    /// Word-level timings when the recognizer produced them.
    #[serde(default)]
    pub words: Vec<WordSpan>,
}

impl TimedSpan {
    /// Creates a span without word detail.
    pub fn new(text: impl Into<String>, start: f64, end: f64, confidence: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence,
            words: Vec::new(),
        }
    }

    /// Span duration in seconds. May be zero; never validated here.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Number of whitespace-separated tokens in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// One word with timing, as reported by the recognizer.
#[derive(Debug, Clone, Deserialize)]
pub struct WordSpan {
    /// The word text, possibly with leading whitespace from the recognizer.
    pub word: String,
    /// Word start in seconds.
    #[serde(default)]
    pub start: f64,
    /// Word end in seconds.
    #[serde(default)]
    pub end: f64,
    /// Recognition probability in [0, 1] (default: 0.8 when absent).
    #[serde(default = "default_word_probability")]
    pub probability: f64,
}

fn default_word_probability() -> f64 {
    0.8
}

impl WordSpan {
    pub fn new(word: impl Into<String>, start: f64, end: f64, probability: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
            probability,
        }
    }

    /// Word duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A transcript span with its assigned speaker.
#[derive(Debug, Clone, Serialize)]
pub struct LabeledSpan {
    /// Transcribed text, unchanged from the input span.
    pub text: String,
    /// Span start in seconds.
    pub start: f64,
    /// Span end in seconds.
    pub end: f64,
    /// Speaker identity, unique within this run.
    pub speaker: SpeakerId,
    /// Localized display label, e.g. "Speaker 2".
    pub label: String,
    /// Assignment confidence in [0, 1]: the match similarity when the span
    /// matched an existing profile, otherwise the recognizer confidence.
    pub confidence: f64,
}

/// Normalizes a recognizer confidence to [0, 1].
///
/// Values above zero are treated as probabilities; values at or below zero
/// are treated as average log-probabilities and shifted by one (Whisper's
/// `avg_logprob` sits mostly in [-1, 0]). The result is clamped to [0, 1].
pub fn norm_confidence(raw: f64) -> f64 {
    let p = if raw > 0.0 { raw } else { raw + 1.0 };
    p.clamp(0.0, 1.0)
}

/// Rejects spans whose timing is inverted.
///
/// Any span or nested word with `end < start` fails the whole batch; callers
/// never see partial output from malformed input. Zero-duration spans pass.
pub fn validate(spans: &[TimedSpan]) -> Result<(), DiarizeError> {
    for (index, span) in spans.iter().enumerate() {
        if span.end < span.start {
            return Err(DiarizeError::MalformedSpan {
                index,
                start: span.start,
                end: span.end,
            });
        }
        for w in &span.words {
            if w.end < w.start {
                return Err(DiarizeError::MalformedSpan {
                    index,
                    start: w.start,
                    end: w.end,
                });
            }
        }
    }
    Ok(())
}

/// Wrapper matching the top-level Whisper verbose JSON document.
#[derive(Debug, Deserialize)]
struct TranscriptDoc {
    #[serde(default)]
    segments: Vec<TimedSpan>,
}

/// Parses a transcript from Whisper-style verbose JSON.
///
/// Accepts either a full document (`{"segments": [...]}`) or a bare segment
/// array.
pub fn parse_transcript(json: &str) -> Result<Vec<TimedSpan>, serde_json::Error> {
    let trimmed = json.trim_start();
    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
    } else {
        let doc: TranscriptDoc = serde_json::from_str(trimmed)?;
        Ok(doc.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_confidence_ranges() {
        assert_eq!(norm_confidence(0.9), 0.9);
        assert!((norm_confidence(-0.3) - 0.7).abs() < 1e-12);
        assert_eq!(norm_confidence(-2.5), 0.0);
        assert_eq!(norm_confidence(1.7), 1.0);
        // Zero is an absent logprob, not a perfect probability.
        assert_eq!(norm_confidence(0.0), 1.0);
    }

    #[test]
    fn validate_rejects_inverted_span() {
        let spans = vec![
            TimedSpan::new("ok", 0.0, 1.0, 0.9),
            TimedSpan::new("bad", 3.0, 2.0, 0.9),
        ];
        let err = validate(&spans).unwrap_err();
        match err {
            DiarizeError::MalformedSpan { index, start, end } => {
                assert_eq!(index, 1);
                assert_eq!(start, 3.0);
                assert_eq!(end, 2.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_rejects_inverted_word() {
        let mut span = TimedSpan::new("one two", 0.0, 2.0, 0.9);
        span.words.push(WordSpan::new("one", 0.0, 0.5, 0.9));
        span.words.push(WordSpan::new("two", 1.5, 1.0, 0.9));
        assert!(validate(&[span]).is_err());
    }

    #[test]
    fn validate_tolerates_zero_duration() {
        let spans = vec![TimedSpan::new("hm", 1.0, 1.0, 0.5)];
        assert!(validate(&spans).is_ok());
    }

    #[test]
    fn deserialize_whisper_segment() {
        let json = r#"{
            "id": 0,
            "start": 0.0,
            "end": 2.4,
            "text": " Hello there.",
            "avg_logprob": -0.25,
            "no_speech_prob": 0.01,
            "words": [
                {"word": " Hello", "start": 0.0, "end": 1.0, "probability": 0.98},
                {"word": " there.", "start": 1.0, "end": 2.4}
            ]
        }"#;
        let span: TimedSpan = serde_json::from_str(json).unwrap();
        assert_eq!(span.text, " Hello there.");
        assert!((span.confidence - (-0.25)).abs() < 1e-12);
        assert_eq!(span.words.len(), 2);
        assert_eq!(span.words[0].probability, 0.98);
        // Missing probability takes the recognizer default.
        assert_eq!(span.words[1].probability, 0.8);
    }

    #[test]
    fn parse_transcript_accepts_document_and_array() {
        let doc = r#"{"text": "hi", "segments": [{"text": "hi", "start": 0.0, "end": 1.0}]}"#;
        let arr = r#"[{"text": "hi", "start": 0.0, "end": 1.0}]"#;
        assert_eq!(parse_transcript(doc).unwrap().len(), 1);
        assert_eq!(parse_transcript(arr).unwrap().len(), 1);
        assert!(parse_transcript(r#"{"segments": []}"#).unwrap().is_empty());
    }

    #[test]
    fn word_count_splits_whitespace() {
        let span = TimedSpan::new("  one   two three ", 0.0, 1.0, 0.9);
        assert_eq!(span.word_count(), 3);
        assert_eq!(TimedSpan::new("", 0.0, 1.0, 0.9).word_count(), 0);
    }
}

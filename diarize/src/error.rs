use thiserror::Error;

/// Errors returned by diarization operations.
#[derive(Debug, Error)]
pub enum DiarizeError {
    #[error("malformed span {index}: end {end} precedes start {start}")]
    MalformedSpan { index: usize, start: f64, end: f64 },

    #[error("cannot extract features from empty text")]
    EmptyText,

    #[error("audio source error: {0}")]
    Audio(String),
}

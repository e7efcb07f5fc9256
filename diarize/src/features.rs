//! Acoustic feature extraction from transcript spans and PCM windows.
//!
//! Two granularities share one vector type. Segment-level extraction derives
//! coarse voice proxies from timing and text alone (no audio needed);
//! word-level extraction computes signal statistics from a PCM16 window.

use tracing::debug;

use crate::error::DiarizeError;
use crate::span::{norm_confidence, TimedSpan};

/// Number of cepstral coefficients in a feature vector.
pub const CEPSTRUM_LEN: usize = 13;
/// Number of formant estimates in a feature vector.
pub const FORMANT_LEN: usize = 3;

/// One speech span reduced to comparable acoustic measurements.
///
/// Segment-level vectors populate only the first four fields; word-level
/// vectors computed from audio populate all of them. Values are immutable
/// once produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    /// Estimated fundamental frequency in Hz.
    pub pitch_hz: f64,
    /// Loudness proxy: chars-per-second at segment level, normalized RMS
    /// amplitude at word level.
    pub energy: f64,
    /// Words per second.
    pub speaking_rate: f64,
    /// Fraction of the span spent not speaking, in [0, 1].
    pub pause_ratio: f64,
    /// Brightness proxy in Hz.
    pub spectral_centroid: f64,
    /// Sign changes per sample (word level only).
    pub zero_crossing_rate: f64,
    /// Heuristic formant estimates F1-F3 in Hz (word level only).
    pub formants: [f64; FORMANT_LEN],
    /// Coarse cepstrum-like envelope (word level only).
    pub cepstrum: [f64; CEPSTRUM_LEN],
}

impl FeatureVector {
    /// The all-zero vector, produced when a window carries no signal.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// True when every component is zero.
    pub fn is_neutral(&self) -> bool {
        self.pitch_hz == 0.0
            && self.energy == 0.0
            && self.speaking_rate == 0.0
            && self.pause_ratio == 0.0
            && self.spectral_centroid == 0.0
            && self.zero_crossing_rate == 0.0
            && self.formants.iter().all(|v| *v == 0.0)
            && self.cepstrum.iter().all(|v| *v == 0.0)
    }

    /// Adds `other` component-wise. Centroid math only.
    pub(crate) fn accumulate(&mut self, other: &FeatureVector) {
        self.pitch_hz += other.pitch_hz;
        self.energy += other.energy;
        self.speaking_rate += other.speaking_rate;
        self.pause_ratio += other.pause_ratio;
        self.spectral_centroid += other.spectral_centroid;
        self.zero_crossing_rate += other.zero_crossing_rate;
        for (a, b) in self.formants.iter_mut().zip(other.formants.iter()) {
            *a += b;
        }
        for (a, b) in self.cepstrum.iter_mut().zip(other.cepstrum.iter()) {
            *a += b;
        }
    }

    /// Multiplies every component by `k`. Centroid math only.
    pub(crate) fn scale(&mut self, k: f64) {
        self.pitch_hz *= k;
        self.energy *= k;
        self.speaking_rate *= k;
        self.pause_ratio *= k;
        self.spectral_centroid *= k;
        self.zero_crossing_rate *= k;
        for v in &mut self.formants {
            *v *= k;
        }
        for v in &mut self.cepstrum {
            *v *= k;
        }
    }
}

/// Configures feature extraction.
///
/// Defaults match the calibration the similarity weights were tuned against;
/// change them together or not at all.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Duration floor in seconds for rate and energy division (default: 0.1).
    pub min_duration: f64,
    /// Assumed speech time per word in seconds, for the pause estimate
    /// (default: 0.15).
    pub avg_word_duration: f64,
    /// Base of the confidence-derived pitch proxy in Hz (default: 100).
    pub pitch_base: f64,
    /// Span of the confidence-derived pitch proxy in Hz (default: 50).
    pub pitch_span: f64,
    /// Lowest fundamental considered by autocorrelation in Hz (default: 50).
    pub pitch_floor_hz: f64,
    /// Highest fundamental considered by autocorrelation in Hz (default: 400).
    pub pitch_ceil_hz: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_duration: 0.1,
            avg_word_duration: 0.15,
            pitch_base: 100.0,
            pitch_span: 50.0,
            pitch_floor_hz: 50.0,
            pitch_ceil_hz: 400.0,
        }
    }
}

/// Derives [`FeatureVector`]s from spans and PCM windows.
///
/// Pure and deterministic: the same input always yields the same vector.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    cfg: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(cfg: FeatureConfig) -> Self {
        Self { cfg }
    }

    /// Extracts segment-level features from timing and text alone.
    ///
    /// Without audio the voice is approximated by proxies: the recognizer
    /// confidence stands in for pitch (more confident recognition correlates
    /// with clearer voicing), text density for energy. Coarse, but stable
    /// enough to separate speakers with distinct deliveries.
    ///
    /// Returns [`DiarizeError::EmptyText`] for spans with no text; callers
    /// are expected to have skipped those.
    pub fn extract(&self, span: &TimedSpan) -> Result<FeatureVector, DiarizeError> {
        if span.text.trim().is_empty() {
            return Err(DiarizeError::EmptyText);
        }

        let duration = span.duration();
        let clamped = duration.max(self.cfg.min_duration);
        let words = span.word_count() as f64;
        let chars = span.text.chars().count() as f64;

        let speaking_rate = words / clamped;
        let pitch_hz =
            self.cfg.pitch_base + norm_confidence(span.confidence) * self.cfg.pitch_span;
        let energy = chars / clamped;
        let pause_ratio = pause_ratio(duration, words, self.cfg.avg_word_duration);
        let spectral_centroid = pitch_hz * (1.0 + speaking_rate / 10.0);

        Ok(FeatureVector {
            pitch_hz,
            energy,
            speaking_rate,
            pause_ratio,
            spectral_centroid,
            ..FeatureVector::default()
        })
    }

    /// Extracts word-level features from a mono PCM16 window.
    ///
    /// An empty window yields [`FeatureVector::neutral`], never an error;
    /// missing audio for one word must not fail the run.
    pub fn extract_from_audio(
        &self,
        word_text: &str,
        start: f64,
        end: f64,
        samples: &[i16],
        sample_rate: u32,
    ) -> FeatureVector {
        if samples.is_empty() || sample_rate == 0 {
            debug!(word = word_text, start, end, "empty audio window, neutral features");
            return FeatureVector::neutral();
        }

        let n = samples.len();
        let nf = n as f64;

        // RMS amplitude, normalized to [0, 1].
        let mut sq_sum = 0.0f64;
        for &s in samples {
            let v = s as f64;
            sq_sum += v * v;
        }
        let rms = (sq_sum / nf).sqrt();
        let energy = rms / 32768.0;

        // Sign changes per sample.
        let mut crossings = 0usize;
        for w in samples.windows(2) {
            if (w[0] >= 0) != (w[1] >= 0) {
                crossings += 1;
            }
        }
        let zero_crossing_rate = crossings as f64 / nf;

        let pitch_hz = self.autocorrelation_pitch(samples, sample_rate);
        let spectral_centroid = spectral_centroid(samples, sample_rate);

        // Formant estimates. Bounded offsets into the typical F1/F2/F3 bands,
        // derived from the signal statistics above so the same window always
        // maps to the same point.
        let nyquist = sample_rate as f64 / 2.0;
        let formants = [
            700.0 + 200.0 * zero_crossing_rate.clamp(0.0, 1.0),
            1500.0 + 300.0 * energy.clamp(0.0, 1.0),
            2500.0 + 400.0 * (spectral_centroid / nyquist).clamp(0.0, 1.0),
        ];

        let cepstrum = coarse_cepstrum(samples);

        // Text-derived components reuse the segment formulas on the word.
        let duration = end - start;
        let clamped = duration.max(self.cfg.min_duration);
        let words = word_text.split_whitespace().count() as f64;
        let speaking_rate = words / clamped;

        FeatureVector {
            pitch_hz,
            energy,
            speaking_rate,
            pause_ratio: pause_ratio(duration, words, self.cfg.avg_word_duration),
            spectral_centroid,
            zero_crossing_rate,
            formants,
            cepstrum,
        }
    }

    /// Fundamental frequency by autocorrelation peak over the configured
    /// pitch band. Returns 0 when no period correlates positively.
    fn autocorrelation_pitch(&self, samples: &[i16], sample_rate: u32) -> f64 {
        let rate = sample_rate as f64;
        let min_period = (rate / self.cfg.pitch_ceil_hz) as usize;
        let max_period = (rate / self.cfg.pitch_floor_hz) as usize;
        let n = samples.len();

        let mut best_period = 0usize;
        let mut best_corr = 0.0f64;
        for period in min_period.max(1)..=max_period {
            if period >= n {
                break;
            }
            let mut corr = 0.0f64;
            for i in 0..n - period {
                corr += samples[i] as f64 * samples[i + period] as f64;
            }
            if corr > best_corr {
                best_corr = corr;
                best_period = period;
            }
        }

        if best_period > 0 {
            rate / best_period as f64
        } else {
            0.0
        }
    }
}

fn pause_ratio(duration: f64, words: f64, avg_word_duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    ((duration - words * avg_word_duration) / duration).max(0.0)
}

/// Amplitude-weighted mean of the sample-index frequency proxy
/// `i * rate / (2 * len)`. Coarse brightness measure, not an FFT.
fn spectral_centroid(samples: &[i16], sample_rate: u32) -> f64 {
    let n = samples.len();
    let mut weighted = 0.0f64;
    let mut total = 0.0f64;
    for (i, &s) in samples.iter().enumerate() {
        let mag = (s as f64).abs();
        let freq = i as f64 * sample_rate as f64 / (2.0 * n as f64);
        weighted += mag * freq;
        total += mag;
    }
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// Log mean absolute amplitude over an even partition of the window into
/// [`CEPSTRUM_LEN`] chunks. Windows with fewer samples than chunks leave the
/// empty chunks at zero.
fn coarse_cepstrum(samples: &[i16]) -> [f64; CEPSTRUM_LEN] {
    let n = samples.len();
    let mut cep = [0.0f64; CEPSTRUM_LEN];
    for (k, c) in cep.iter_mut().enumerate() {
        let lo = k * n / CEPSTRUM_LEN;
        let hi = (k + 1) * n / CEPSTRUM_LEN;
        if hi > lo {
            let mut abs_sum = 0.0f64;
            for &s in &samples[lo..hi] {
                abs_sum += (s as f64).abs();
            }
            let mean_abs = abs_sum / (hi - lo) as f64;
            *c = (1.0 + mean_abs).ln() / 32768.0;
        }
    }
    cep
}

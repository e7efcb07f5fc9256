//! Audio sample access for word-level feature extraction.
//!
//! The clustering pipeline only ever needs short windows of mono PCM16
//! keyed by a time range, so the seam is a small trait rather than a
//! full decoder stack. [`PcmClip`] is the in-memory implementation used
//! by the CLI and by tests.

use crate::error::DiarizeError;

/// Provides mono PCM16 samples for a time window of the recording.
///
/// Implementations must be safe to call from multiple extraction
/// threads at once.
pub trait AudioSource: Send + Sync {
    /// Returns the samples covering `start..end` seconds, resampled to
    /// `sample_rate` if the backing data uses a different rate.
    ///
    /// A window entirely outside the recording yields an empty vector,
    /// not an error. Errors are reserved for I/O and decode failures.
    fn samples(&self, start: f64, end: f64, sample_rate: u32) -> Result<Vec<i16>, DiarizeError>;
}

/// A whole recording held in memory as mono PCM16.
#[derive(Debug, Clone)]
pub struct PcmClip {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl PcmClip {
    /// Wraps mono PCM16 samples at the given rate.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of the clip in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Native sample rate of the clip.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Slices the clip at its native rate, clamping to the clip bounds.
    fn window(&self, start: f64, end: f64) -> &[i16] {
        if end <= start || self.samples.is_empty() || self.sample_rate == 0 {
            return &[];
        }
        let rate = self.sample_rate as f64;
        let lo = ((start.max(0.0) * rate) as usize).min(self.samples.len());
        let hi = ((end.max(0.0) * rate).ceil() as usize).min(self.samples.len());
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }
}

impl AudioSource for PcmClip {
    fn samples(&self, start: f64, end: f64, sample_rate: u32) -> Result<Vec<i16>, DiarizeError> {
        let native = self.window(start, end);
        if sample_rate == self.sample_rate || native.is_empty() || sample_rate == 0 {
            return Ok(native.to_vec());
        }

        // Linear interpolation is plenty for coarse voice features.
        let ratio = sample_rate as f64 / self.sample_rate as f64;
        let out_len = (native.len() as f64 * ratio).ceil() as usize;
        let mut out = Vec::with_capacity(out_len);

        for i in 0..out_len {
            let src_pos = i as f64 / ratio;
            let src_idx = src_pos as usize;
            let frac = src_pos - src_idx as f64;

            let sample = if src_idx + 1 < native.len() {
                let a = native[src_idx] as f64;
                let b = native[src_idx + 1] as f64;
                (a + (b - a) * frac) as i16
            } else if src_idx < native.len() {
                native[src_idx]
            } else {
                0
            };
            out.push(sample);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<i16> {
        (0..len).map(|i| i as i16).collect()
    }

    #[test]
    fn window_selects_requested_range() {
        let clip = PcmClip::new(ramp(16000), 16000);
        let out = clip.samples(0.5, 0.75, 16000).unwrap();
        assert_eq!(out.len(), 4000);
        assert_eq!(out[0], 8000);
        assert_eq!(out[3999], 11999);
    }

    #[test]
    fn window_clamps_to_clip_bounds() {
        let clip = PcmClip::new(ramp(8000), 16000);
        // Clip covers 0..0.5s; ask past the end.
        let out = clip.samples(0.4, 2.0, 16000).unwrap();
        assert_eq!(out.len(), 1600);
        assert_eq!(out[0], 6400);
    }

    #[test]
    fn window_outside_clip_is_empty() {
        let clip = PcmClip::new(ramp(8000), 16000);
        assert!(clip.samples(1.0, 2.0, 16000).unwrap().is_empty());
        assert!(clip.samples(0.5, 0.2, 16000).unwrap().is_empty());
    }

    #[test]
    fn empty_clip_yields_empty_windows() {
        let clip = PcmClip::new(Vec::new(), 16000);
        assert_eq!(clip.duration(), 0.0);
        assert!(clip.samples(0.0, 1.0, 16000).unwrap().is_empty());
    }

    #[test]
    fn downsampling_halves_sample_count() {
        let clip = PcmClip::new(ramp(16000), 16000);
        let out = clip.samples(0.0, 1.0, 8000).unwrap();
        assert_eq!(out.len(), 8000);
        // Every output sample maps to twice its index in the source ramp.
        assert_eq!(out[100], 200);
        assert_eq!(out[4000], 8000);
    }

    #[test]
    fn upsampling_interpolates_between_samples() {
        let clip = PcmClip::new(vec![0, 100, 200, 300], 4);
        let out = clip.samples(0.0, 1.0, 8).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 50);
        assert_eq!(out[2], 100);
        assert_eq!(out[3], 150);
    }

    #[test]
    fn duration_reflects_sample_count() {
        let clip = PcmClip::new(ramp(24000), 16000);
        assert!((clip.duration() - 1.5).abs() < 1e-9);
    }
}

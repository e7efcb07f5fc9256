//! WAV decoding and resampling to the analysis rate.

use std::path::Path;

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use talkturn_diarize::PcmClip;
use tracing::debug;

const SINC_LEN: usize = 128;
const OVERSAMPLING_FACTOR: usize = 128;
const RESAMPLE_CHUNK_SIZE: usize = 1024;

/// Loads a WAV file as mono PCM16 at the given rate.
///
/// Multi-channel files are downmixed by averaging. Float and non-16-bit
/// integer formats are rescaled. Resampling runs once over the whole clip.
pub fn load_wav(path: &Path, target_rate: u32) -> Result<PcmClip> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    debug!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "loaded wav"
    );

    let mono = read_mono(&mut reader, &spec)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    let samples = resample(mono, spec.sample_rate, target_rate)?;
    Ok(PcmClip::new(samples, target_rate))
}

fn read_mono<R: std::io::Read>(
    reader: &mut hound::WavReader<R>,
    spec: &hound::WavSpec,
) -> Result<Vec<i16>> {
    let channels = spec.channels.max(1) as usize;
    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
        (hound::SampleFormat::Int, bits) if bits < 16 => {
            let shift = 16 - bits;
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v << shift))
                .collect::<Result<_, _>>()?
        }
        (hound::SampleFormat::Int, bits) => {
            let shift = bits - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()?
        }
    };
    if channels == 1 {
        return Ok(interleaved);
    }
    Ok(interleaved
        .chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect())
}

/// Whole-clip sample rate conversion via a windowed-sinc resampler.
fn resample(samples: Vec<i16>, from_rate: u32, to_rate: u32) -> Result<Vec<i16>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: rubato::calculate_cutoff(SINC_LEN, WindowFunction::BlackmanHarris2),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: OVERSAMPLING_FACTOR,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK_SIZE, 1)
        .with_context(|| format!("failed to create resampler ({from_rate}Hz -> {to_rate}Hz)"))?;

    let input: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();
    let mut out: Vec<i16> = Vec::with_capacity((input.len() as f64 * ratio).ceil() as usize);

    let mut pos = 0;
    while input.len() - pos >= RESAMPLE_CHUNK_SIZE {
        let chunk: [&[f32]; 1] = [&input[pos..pos + RESAMPLE_CHUNK_SIZE]];
        let frames = resampler.process(&chunk, None)?;
        push_frames(&frames, &mut out);
        pos += RESAMPLE_CHUNK_SIZE;
    }

    if pos < input.len() {
        let tail: [&[f32]; 1] = [&input[pos..]];
        let frames = resampler.process_partial(Some(&tail), None)?;
        push_frames(&frames, &mut out);
    }

    // Flush the resampler's internal delay.
    let frames = resampler.process_partial::<Vec<f32>>(None, None)?;
    push_frames(&frames, &mut out);

    debug!(input = samples.len(), output = out.len(), from_rate, to_rate, "resampled");
    Ok(out)
}

fn push_frames(frames: &[Vec<f32>], out: &mut Vec<i16>) {
    if let Some(ch) = frames.first() {
        out.extend(
            ch.iter()
                .map(|v| (v * 32767.0).clamp(-32768.0, 32767.0) as i16),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkturn_diarize::AudioSource;

    fn write_test_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for ch in 0..channels {
                let v = ((i as i64 % 100) * 100) as i16 + ch as i16;
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_mono_wav_at_native_rate() {
        let path = std::env::temp_dir().join("talkturn_test_mono.wav");
        write_test_wav(&path, 1, 16000, 1600);
        let clip = load_wav(&path, 16000).unwrap();
        assert!((clip.duration() - 0.1).abs() < 1e-9);
        let samples = clip.samples(0.0, 0.1, 16000).unwrap();
        assert_eq!(samples.len(), 1600);
        assert_eq!(samples[1], 100);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        let path = std::env::temp_dir().join("talkturn_test_stereo.wav");
        write_test_wav(&path, 2, 16000, 800);
        let clip = load_wav(&path, 16000).unwrap();
        let samples = clip.samples(0.0, 0.05, 16000).unwrap();
        assert_eq!(samples.len(), 800);
        // Frame i holds (v, v + 1); the mix rounds down to v.
        assert_eq!(samples[3], 300);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn resamples_to_target_rate() {
        let path = std::env::temp_dir().join("talkturn_test_8k.wav");
        write_test_wav(&path, 1, 8000, 8000);
        let clip = load_wav(&path, 16000).unwrap();
        // One second of audio at twice the rate, give or take resampler edges.
        let n = clip.samples(0.0, 10.0, 16000).unwrap().len();
        assert!(
            (n as i64 - 16000).unsigned_abs() < 1024,
            "unexpected resampled length {n}"
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn identity_resample_is_untouched() {
        let samples = vec![1i16, 2, 3, 4];
        let out = resample(samples.clone(), 16000, 16000).unwrap();
        assert_eq!(out, samples);
    }
}

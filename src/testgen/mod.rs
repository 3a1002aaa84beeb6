// src/testgen/mod.rs
//
// Synthetic voice-like signals for tests and demos.
// A glottal impulse train is passed through three cascaded two-pole
// resonators, one per formant; WAV files are written with hound.

use std::f32::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Source F0 and three (frequency, bandwidth) formant pairs, in Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VowelSpec {
    pub f0_hz: f32,
    /// F0 reached at the end of the signal; linear glide from `f0_hz`
    pub f0_end_hz: f32,
    pub formants: [(f32, f32); 3],
}

impl VowelSpec {
    pub fn new(f0_hz: f32, formants: [(f32, f32); 3]) -> Self {
        Self {
            f0_hz,
            f0_end_hz: f0_hz,
            formants,
        }
    }

    /// Glide the source pitch linearly to `f0_end_hz`
    pub fn gliding_to(mut self, f0_end_hz: f32) -> Self {
        self.f0_end_hz = f0_end_hz;
        self
    }

    /// Typical adult male /a/
    pub fn male_a() -> Self {
        Self::new(110.0, [(730.0, 80.0), (1090.0, 90.0), (2440.0, 120.0)])
    }

    /// Typical adult female /i/
    pub fn female_i() -> Self {
        Self::new(220.0, [(310.0, 60.0), (2790.0, 110.0), (3310.0, 140.0)])
    }
}

/// Two-pole resonator `y[n] = x[n] + a1·y[n-1] - a2·y[n-2]`
struct Resonator {
    a1: f32,
    a2: f32,
    y1: f32,
    y2: f32,
}

impl Resonator {
    fn new(freq_hz: f32, bandwidth_hz: f32, sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        let r = (-PI * bandwidth_hz / sr).exp();
        let theta = 2.0 * PI * freq_hz / sr;
        Self {
            a1: 2.0 * r * theta.cos(),
            a2: r * r,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = x + self.a1 * self.y1 - self.a2 * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Synthesise `len` samples of a vowel, normalised to a peak of `amplitude`
pub fn synth_vowel(spec: &VowelSpec, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    if len == 0 || sample_rate == 0 {
        return Vec::new();
    }
    let sr = sample_rate as f32;
    let mut resonators: Vec<Resonator> = spec
        .formants
        .iter()
        .map(|&(f, bw)| Resonator::new(f, bw, sample_rate))
        .collect();

    let mut phase = 1.0f32;
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let t = i as f32 / len as f32;
        let f0 = spec.f0_hz + (spec.f0_end_hz - spec.f0_hz) * t;
        phase += f0 / sr;
        let excitation = if phase >= 1.0 {
            phase -= 1.0;
            1.0
        } else {
            0.0
        };
        let y = resonators
            .iter_mut()
            .fold(excitation, |acc, r| r.process(acc));
        out.push(y);
    }

    normalize_peak(&mut out, amplitude);
    out
}

/// Pure sine of `duration_secs`
pub fn generate_sine(freq_hz: f32, sample_rate: u32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * duration_secs) as usize;
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

pub fn generate_silence(sample_rate: u32, duration_secs: f32) -> Vec<f32> {
    vec![0.0; (sample_rate as f32 * duration_secs) as usize]
}

/// Deterministic white noise in `[-amplitude, amplitude]` (xorshift32)
pub fn generate_noise(sample_rate: u32, duration_secs: f32, amplitude: f32, seed: u32) -> Vec<f32> {
    let n = (sample_rate as f32 * duration_secs) as usize;
    let mut state = seed.max(1);
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            amplitude * ((state as f32 / u32::MAX as f32) * 2.0 - 1.0)
        })
        .collect()
}

fn normalize_peak(samples: &mut [f32], amplitude: f32) {
    let peak = samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
    if peak > 0.0 {
        let gain = amplitude / peak;
        samples.iter_mut().for_each(|s| *s *= gain);
    }
}

/// Write mono samples as a 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(v)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vowel_peak_normalised() {
        let v = synth_vowel(&VowelSpec::male_a(), 22050, 4096, 0.5);
        assert_eq!(v.len(), 4096);
        let peak = v.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_vowel_pitch_is_detectable() {
        use crate::core::analysis::PitchDetector;

        let mut detector = PitchDetector::new();
        for spec in [VowelSpec::male_a(), VowelSpec::female_i()] {
            let v = synth_vowel(&spec, 22050, 22050, 0.5);
            for frame in v.chunks_exact(2048) {
                let estimate = detector.detect(frame, 22050);
                assert!(
                    (estimate.f0_hz - spec.f0_hz).abs() < 0.03 * spec.f0_hz,
                    "f0 {} for source {}",
                    estimate.f0_hz,
                    spec.f0_hz
                );
                assert!(estimate.confidence > 0.45);
            }
        }
    }

    #[test]
    fn test_sine_and_silence_lengths() {
        assert_eq!(generate_sine(100.0, 8000, 0.5, 1.0).len(), 4000);
        assert!(generate_silence(8000, 0.25).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = generate_noise(8000, 0.1, 0.3, 7);
        let b = generate_noise(8000, 0.1, 0.3, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.abs() <= 0.3));
    }
}

// src/core/analysis/formant.rs
//
// Formant estimation by LPC spectral peak picking.
// Decimate -> pre-emphasis -> Hann -> autocorrelation -> Levinson-Durbin ->
// all-pole envelope -> harmonic suppression -> band-wise peak claiming.
// Also produces the raw F2/F3 resonance score against reference statistics.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::core::dsp::{clamp01, hann_window, Ema};

/// Rate the frame is decimated towards before LPC analysis
pub const TARGET_SAMPLE_RATE: u32 = 22050;
/// Fallback formants used when nothing can be measured
pub const FALLBACK_FORMANTS: [f32; 3] = [500.0, 1500.0, 2500.0];

const LPC_ORDER: usize = 12;
const ENVELOPE_FFT_SIZE: usize = 2048;
const MIN_DECIMATED_SAMPLES: usize = 256;
const PRE_EMPHASIS: f32 = 0.97;
const RESONANCE_SMOOTHING: f32 = 0.2;
const HARMONIC_TOLERANCE: f32 = 0.08;
const HARMONIC_ATTENUATION: f64 = 0.15;
const MIN_HARMONIC_F0_HZ: f32 = 40.0;
const CANDIDATE_MIN_HZ: f32 = 200.0;
const CANDIDATE_MAX_HZ: f32 = 5000.0;

const F1_BAND: (f32, f32) = (200.0, 900.0);
const F2_BAND: (f32, f32) = (800.0, 2500.0);
const F3_BAND: (f32, f32) = (1800.0, 4000.0);

/// Per-frame formant estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormantEstimate {
    pub f1: f32,
    pub f2: f32,
    pub f3: f32,
    /// Smoothed F2/F3 resonance score in [0, 1]
    pub resonance01: f32,
}

impl FormantEstimate {
    /// Neutral estimate for frames that cannot be analysed
    pub fn fallback() -> Self {
        Self {
            f1: FALLBACK_FORMANTS[0],
            f2: FALLBACK_FORMANTS[1],
            f3: FALLBACK_FORMANTS[2],
            resonance01: 0.5,
        }
    }
}

/// Mean/stdev pair for one formant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormantStat {
    pub mean: f32,
    #[serde(alias = "stdev")]
    pub std: f32,
}

/// Per-phoneme F2/F3 statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhonemeFormants {
    pub f2: FormantStat,
    pub f3: FormantStat,
}

/// Reference statistics the resonance z-scores are taken against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormantReference {
    pub f2: FormantStat,
    pub f3: FormantStat,
    /// Weight of the F2 z-score
    pub w2: f32,
    /// Weight of the F3 z-score
    pub w3: f32,
}

impl Default for FormantReference {
    fn default() -> Self {
        Self {
            f2: FormantStat { mean: 1500.0, std: 350.0 },
            f3: FormantStat { mean: 2500.0, std: 350.0 },
            w2: 0.732_142_86,
            w3: 0.267_857_14,
        }
    }
}

impl FormantReference {
    /// Average per-phoneme statistics into one reference.
    ///
    /// Returns the default reference when `phonemes` is empty.
    pub fn from_phonemes(phonemes: &HashMap<String, PhonemeFormants>) -> Self {
        let base = Self::default();
        if phonemes.is_empty() {
            return base;
        }
        let n = phonemes.len() as f32;
        let avg = |f: fn(&PhonemeFormants) -> f32| phonemes.values().map(f).sum::<f32>() / n;
        Self {
            f2: FormantStat {
                mean: avg(|p| p.f2.mean),
                std: avg(|p| p.f2.std),
            },
            f3: FormantStat {
                mean: avg(|p| p.f3.mean),
                std: avg(|p| p.f3.std),
            },
            ..base
        }
    }

    /// Unsmoothed resonance: `clamp01((w2·z(F2) + w3·z(F3) + 2) / 4)`
    pub fn raw_resonance(&self, f2: f32, f3: f32) -> f32 {
        let z2 = z_score(f2, self.f2);
        let z3 = z_score(f3, self.f3);
        clamp01((self.w2 * z2 + self.w3 * z3 + 2.0) / 4.0)
    }
}

fn z_score(v: f32, stat: FormantStat) -> f32 {
    if stat.std > 0.0 {
        (v - stat.mean) / stat.std
    } else {
        0.0
    }
}

/// Stateful formant estimator; holds the resonance smoother for one session
#[derive(Debug, Clone)]
pub struct FormantEstimator {
    reference: FormantReference,
    resonance_ema: Ema,
}

impl Default for FormantEstimator {
    fn default() -> Self {
        Self::new(FormantReference::default())
    }
}

impl FormantEstimator {
    pub fn new(reference: FormantReference) -> Self {
        Self {
            reference,
            resonance_ema: Ema::new(RESONANCE_SMOOTHING),
        }
    }

    pub fn reference(&self) -> &FormantReference {
        &self.reference
    }

    /// Estimate F1-F3 and the smoothed resonance for one frame.
    ///
    /// `f0_hz` enables suppression of harmonic leakage when above 40 Hz.
    pub fn estimate(&mut self, frame: &[f32], sample_rate: u32, f0_hz: Option<f32>) -> FormantEstimate {
        let Some(envelope) = lpc_envelope(frame, sample_rate, f0_hz) else {
            return FormantEstimate::fallback();
        };

        let [f1, f2, f3] = pick_formants(&envelope.magnitude, envelope.hz_per_bin);
        let raw = self.reference.raw_resonance(f2, f3);
        let resonance01 = clamp01(self.resonance_ema.update(raw));

        FormantEstimate { f1, f2, f3, resonance01 }
    }

    /// Forget the resonance smoothing history
    pub fn reset(&mut self) {
        self.resonance_ema.reset();
    }
}

struct Envelope {
    magnitude: Vec<f64>,
    hz_per_bin: f32,
}

/// All-pole envelope of the frame, `None` when the frame is too short or silent
fn lpc_envelope(frame: &[f32], sample_rate: u32, f0_hz: Option<f32>) -> Option<Envelope> {
    if sample_rate == 0 {
        return None;
    }
    let decim = ((sample_rate / TARGET_SAMPLE_RATE) as usize).max(1);
    let rate = sample_rate as f32 / decim as f32;
    let m = frame.len() / decim;
    if m < MIN_DECIMATED_SAMPLES {
        return None;
    }

    // Integer-stride decimation with first-order pre-emphasis
    let mut x = Vec::with_capacity(m);
    let mut prev = 0.0f32;
    for &s in frame.iter().step_by(decim).take(m) {
        x.push(s - PRE_EMPHASIS * prev);
        prev = s;
    }
    let window = hann_window(m);
    x.iter_mut().zip(&window).for_each(|(s, w)| *s *= w);

    let r = autocorrelation(&x, LPC_ORDER + 1);
    if r[0] <= 0.0 {
        return None;
    }
    let a = levinson_durbin(&r, LPC_ORDER);

    let hz_per_bin = rate / ENVELOPE_FFT_SIZE as f32;
    let f0 = f0_hz.filter(|&f| f > MIN_HARMONIC_F0_HZ);
    let mut magnitude = vec![0.0f64; ENVELOPE_FFT_SIZE / 2];
    for (k, slot) in magnitude.iter_mut().enumerate().skip(1) {
        let w = 2.0 * PI * k as f64 / ENVELOPE_FFT_SIZE as f64;
        let inverse = a
            .iter()
            .enumerate()
            .fold(Complex64::new(0.0, 0.0), |acc, (p, &ap)| {
                acc + Complex64::from_polar(ap, -w * p as f64)
            });
        let power = inverse.norm_sqr();
        let mut mag = if power > 0.0 { 1.0 / power } else { 0.0 };

        if let Some(f0) = f0 {
            let hz = k as f32 * hz_per_bin;
            let harmonic = (hz / f0).round();
            if harmonic >= 1.0 && (hz - harmonic * f0).abs() < f0 * HARMONIC_TOLERANCE {
                mag *= HARMONIC_ATTENUATION;
            }
        }
        *slot = mag;
    }

    Some(Envelope { magnitude, hz_per_bin })
}

/// Claim the strongest peak per band, F1 first; unmatched bands fall back.
fn pick_formants(spec: &[f64], hz_per_bin: f32) -> [f32; 3] {
    let n = spec.len();
    let candidates: Vec<usize> = (2..n.saturating_sub(2))
        .filter(|&k| {
            let v = spec[k];
            v > spec[k - 1] && v > spec[k + 1] && v > spec[k - 2] && v > spec[k + 2]
        })
        .filter(|&k| {
            let hz = k as f32 * hz_per_bin;
            (CANDIDATE_MIN_HZ..=CANDIDATE_MAX_HZ).contains(&hz)
        })
        .collect();

    let mut claimed: Vec<usize> = Vec::with_capacity(3);
    let mut out = FALLBACK_FORMANTS;
    for (slot, (lo, hi)) in [F1_BAND, F2_BAND, F3_BAND].into_iter().enumerate() {
        let best = candidates
            .iter()
            .copied()
            .filter(|k| !claimed.contains(k))
            .filter(|&k| {
                let hz = k as f32 * hz_per_bin;
                hz >= lo && hz <= hi
            })
            .max_by(|&a, &b| spec[a].total_cmp(&spec[b]));
        if let Some(k) = best {
            claimed.push(k);
            out[slot] = k as f32 * hz_per_bin;
        }
    }
    out
}

fn autocorrelation(x: &[f32], lags: usize) -> Vec<f64> {
    (0..lags)
        .map(|lag| {
            if lag >= x.len() {
                return 0.0;
            }
            x[..x.len() - lag]
                .iter()
                .zip(&x[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        })
        .collect()
}

/// Inverse-filter coefficients `[1, -a1, ..., -ap]` via Levinson-Durbin.
fn levinson_durbin(r: &[f64], order: usize) -> Vec<f64> {
    let mut a = vec![0.0f64; order + 1];
    let mut error = r[0];
    for i in 1..=order {
        if error <= 0.0 {
            break;
        }
        let acc: f64 = (1..i).map(|j| a[j] * r[i - j]).sum();
        let k = (r[i] - acc) / error;
        let previous = a.clone();
        a[i] = k;
        for j in 1..i {
            a[j] = previous[j] - k * previous[i - j];
        }
        error *= 1.0 - k * k;
    }

    let mut inverse = Vec::with_capacity(order + 1);
    inverse.push(1.0);
    inverse.extend(a[1..].iter().map(|&c| -c));
    inverse
}

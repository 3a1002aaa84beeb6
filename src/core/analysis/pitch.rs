// src/core/analysis/pitch.rs
//
// Fundamental frequency estimation and pitch-axis normalisation.
// Autocorrelation over the 60-500 Hz lag range with parabolic refinement.

use serde::{Deserialize, Serialize};

use crate::core::dsp::{clamp01, HannCache};

/// Lowest detectable fundamental
pub const MIN_F0_HZ: f32 = 60.0;
/// Highest detectable fundamental
pub const MAX_F0_HZ: f32 = 500.0;

const ENERGY_EPSILON: f32 = 1e-6;

/// Per-frame pitch estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PitchEstimate {
    /// Fundamental frequency in Hz, 0 when unvoiced
    pub f0_hz: f32,
    /// Peak autocorrelation relative to mean frame energy, in [0, 1]
    pub confidence: f32,
}

impl PitchEstimate {
    pub const UNVOICED: PitchEstimate = PitchEstimate {
        f0_hz: 0.0,
        confidence: 0.0,
    };

    pub fn is_voiced(&self) -> bool {
        self.f0_hz > 0.0
    }
}

/// F0 range mapped onto the [0, 1] pitch axis.
///
/// Immutable per session; construct once and pass by value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchRange {
    min_hz: f32,
    max_hz: f32,
}

impl Default for PitchRange {
    fn default() -> Self {
        Self {
            min_hz: 85.0,
            max_hz: 255.0,
        }
    }
}

/// Mean and standard deviation of F0 for one speaker group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupPitchStats {
    pub mean_hz: f32,
    pub std_hz: f32,
}

impl PitchRange {
    /// Build a range; `min_hz` is floored at 10 Hz and the span at 1 Hz.
    pub fn new(min_hz: f32, max_hz: f32) -> Self {
        let min_hz = min_hz.max(10.0);
        let max_hz = max_hz.max(min_hz + 1.0);
        Self { min_hz, max_hz }
    }

    /// Robust range from pooled group statistics: `[min(mean-2σ), max(mean+2σ)]`.
    ///
    /// The lower edge is clamped to 40-200 Hz, the upper edge to 220-500 Hz and
    /// kept at least 40 Hz above the lower edge.
    pub fn from_group_stats(female: GroupPitchStats, male: GroupPitchStats) -> Self {
        let lo = (female.mean_hz - 2.0 * female.std_hz).min(male.mean_hz - 2.0 * male.std_hz);
        let hi = (female.mean_hz + 2.0 * female.std_hz).max(male.mean_hz + 2.0 * male.std_hz);
        let min_hz = lo.clamp(40.0, 200.0);
        let max_hz = hi.clamp(220.0, 500.0).max(min_hz + 40.0);
        Self::new(min_hz, max_hz)
    }

    pub fn min_hz(&self) -> f32 {
        self.min_hz
    }

    pub fn max_hz(&self) -> f32 {
        self.max_hz
    }

    /// Pitch score in [0, 1]: 0 at `min_hz` and below, 1 at `max_hz` and above
    pub fn score(&self, f0_hz: f32) -> f32 {
        let span = (self.max_hz - self.min_hz).max(1.0);
        clamp01((f0_hz - self.min_hz) / span)
    }
}

/// Autocorrelation pitch detector.
///
/// Each frame is Hann-tapered before the autocorrelation so that the
/// fundamental period outranks its multiples on steady tones.
#[derive(Debug, Clone, Default)]
pub struct PitchDetector {
    window: HannCache,
}

impl PitchDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate F0 and confidence for one frame.
    ///
    /// Takes raw samples; the Hann taper is applied internally and the caller's
    /// buffer is left untouched. Never fails: silent or too-short frames are
    /// reported as unvoiced.
    pub fn detect(&mut self, frame: &[f32], sample_rate: u32) -> PitchEstimate {
        if sample_rate == 0 || frame.is_empty() {
            return PitchEstimate::UNVOICED;
        }
        let x = self.window.apply(frame);
        let n = x.len();

        let energy: f32 = x.iter().map(|s| s * s).sum();
        if energy < ENERGY_EPSILON {
            return PitchEstimate::UNVOICED;
        }

        let sr = sample_rate as f32;
        let min_lag = ((sr / MAX_F0_HZ).floor() as usize).max(1);
        let max_lag = (sr / MIN_F0_HZ).floor() as usize;
        if min_lag >= n || min_lag > max_lag {
            return PitchEstimate::UNVOICED;
        }

        let ac = lag_autocorrelation(&x, min_lag, max_lag);

        let mut best_lag = min_lag;
        let mut best_val = f32::NEG_INFINITY;
        for lag in min_lag..=max_lag {
            let v = ac[lag - min_lag];
            if v > best_val {
                best_val = v;
                best_lag = lag;
            }
        }

        // Parabolic interpolation around the peak; edges reuse the peak itself
        let y1 = ac[best_lag.saturating_sub(1).max(min_lag) - min_lag];
        let y2 = best_val;
        let y3 = ac[(best_lag + 1).min(max_lag) - min_lag];
        let denom = y1 - 2.0 * y2 + y3;
        let shift = if denom.abs() > 1e-9 {
            (0.5 * (y1 - y3) / denom).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let refined_lag = best_lag as f32 + shift;
        if refined_lag <= 0.0 {
            return PitchEstimate::UNVOICED;
        }

        let confidence = clamp01(y2 / (energy / n as f32));
        PitchEstimate {
            f0_hz: sr / refined_lag,
            confidence,
        }
    }
}

/// Mean lagged product for every lag in `min_lag..=max_lag`.
///
/// Lags at or beyond the frame length yield 0.
fn lag_autocorrelation(x: &[f32], min_lag: usize, max_lag: usize) -> Vec<f32> {
    let n = x.len();
    (min_lag..=max_lag)
        .map(|lag| {
            if lag >= n {
                return 0.0;
            }
            let count = n - lag;
            let sum: f32 = x[..count].iter().zip(&x[lag..]).map(|(a, b)| a * b).sum();
            sum / count as f32
        })
        .collect()
}

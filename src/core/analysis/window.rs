// src/core/analysis/window.rs
//
// Windowed spectral feature aggregation.
// Frames accumulate into 500 ms windows with a 250 ms hop; each closed window
// yields band energies, spectral centroid, H1-H2, formant medians, vocal tract
// length estimates, prosody range and the two rule-set decisions.

use serde::{Deserialize, Serialize};

use super::formant::FALLBACK_FORMANTS;
use super::pitch::{PitchRange, MAX_F0_HZ, MIN_F0_HZ};
use crate::core::dsp::{clamp01, mean, median, FftProcessor};

/// Window length in milliseconds
pub const WINDOW_MS: u32 = 500;
/// Hop between consecutive windows in milliseconds
pub const HOP_MS: u32 = 250;
/// Speed of sound used for tract length estimates, cm/s
pub const SPEED_OF_SOUND_CM_S: f32 = 34300.0;

const PSD_FFT_SIZE: usize = 2048;
const MIN_TRACK_CONFIDENCE: f32 = 0.6;
const ENERGY_EPSILON: f64 = 1e-12;
const LOG_POWER_FLOOR: f64 = 1e-12;

/// Band split for the EHF/LF ratio and the spectral centroid cutoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandsConfig {
    pub split_hz: f32,
    pub sc_max_hz: f32,
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            split_hz: 1800.0,
            sc_max_hz: 5000.0,
        }
    }
}

/// F0 bands gating the two rule sets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct F0ZoneConfig {
    pub low_max_hz: f32,
    pub high_min_hz: f32,
}

impl Default for F0ZoneConfig {
    fn default() -> Self {
        Self {
            low_max_hz: 165.0,
            high_min_hz: 180.0,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Thresholds of the "feminine-low" rule set (applies to low-F0 windows)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowF0Rules {
    #[serde(rename = "deltaF_min_hz")]
    pub delta_f_min_hz: f32,
    pub vtl_max_cm: f32,
    #[serde(rename = "F2_min_hz")]
    pub f2_min_hz: f32,
    #[serde(rename = "H1_H2_min_db")]
    pub h1h2_min_db: f32,
    #[serde(rename = "EHF_LF_min")]
    pub ehf_lf_min: f32,
    #[serde(rename = "SC_min_hz")]
    pub sc_min_hz: f32,
    pub prosody_min_semitones: f32,
    #[serde(rename = "need_true_at_least")]
    pub min_satisfied: usize,
    /// Count the always-true reserved predicate towards `min_satisfied`
    #[serde(default = "default_true")]
    pub count_placeholder: bool,
}

impl Default for LowF0Rules {
    fn default() -> Self {
        Self {
            delta_f_min_hz: 1000.0,
            vtl_max_cm: 16.5,
            f2_min_hz: 1700.0,
            h1h2_min_db: 8.0,
            ehf_lf_min: 1.1,
            sc_min_hz: 1800.0,
            prosody_min_semitones: 10.0,
            min_satisfied: 5,
            count_placeholder: true,
        }
    }
}

/// Thresholds of the "masculine-high" rule set (applies to high-F0 windows)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighF0Rules {
    #[serde(rename = "deltaF_max_hz")]
    pub delta_f_max_hz: f32,
    pub vtl_min_cm: f32,
    #[serde(rename = "F2_max_hz")]
    pub f2_max_hz: f32,
    #[serde(rename = "H1_H2_max_db")]
    pub h1h2_max_db: f32,
    #[serde(rename = "EHF_LF_max")]
    pub ehf_lf_max: f32,
    #[serde(rename = "SC_max_hz")]
    pub sc_max_hz: f32,
    pub prosody_max_semitones: f32,
    #[serde(rename = "need_true_at_least")]
    pub min_satisfied: usize,
    /// Count the always-true reserved predicate towards `min_satisfied`
    #[serde(default = "default_true")]
    pub count_placeholder: bool,
}

impl Default for HighF0Rules {
    fn default() -> Self {
        Self {
            delta_f_max_hz: 850.0,
            vtl_min_cm: 18.0,
            f2_max_hz: 1500.0,
            h1h2_max_db: 5.0,
            ehf_lf_max: 0.7,
            sc_max_hz: 1500.0,
            prosody_max_semitones: 8.0,
            min_satisfied: 5,
            count_placeholder: true,
        }
    }
}

/// Named predicates, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePredicate {
    FormantSpacing,
    TractLength,
    SecondFormant,
    HarmonicDifference,
    Brightness,
    ProsodyRange,
    /// Reserved slot, always true
    Reserved,
}

/// Satisfied predicates of one rule set for one window
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RuleEvaluation {
    pub satisfied: Vec<RulePredicate>,
}

impl RuleEvaluation {
    fn from_checks(checks: [(RulePredicate, bool); 7], count_reserved: bool) -> Self {
        let satisfied = checks
            .into_iter()
            .filter(|&(p, ok)| ok && (count_reserved || p != RulePredicate::Reserved))
            .map(|(p, _)| p)
            .collect();
        Self { satisfied }
    }

    pub fn count(&self) -> usize {
        self.satisfied.len()
    }
}

/// Acoustic measurements the rule sets are evaluated against
#[derive(Debug, Clone, Copy)]
struct Measurements {
    delta_f: f32,
    vtl: f32,
    f2: f32,
    h1h2: f32,
    ehf_lf: f32,
    sc: f32,
    prosody: f32,
}

impl LowF0Rules {
    fn evaluate(&self, m: &Measurements) -> RuleEvaluation {
        RuleEvaluation::from_checks(
            [
                (RulePredicate::FormantSpacing, m.delta_f >= self.delta_f_min_hz),
                (RulePredicate::TractLength, m.vtl <= self.vtl_max_cm),
                (RulePredicate::SecondFormant, m.f2 >= self.f2_min_hz),
                (RulePredicate::HarmonicDifference, m.h1h2 >= self.h1h2_min_db),
                (
                    RulePredicate::Brightness,
                    m.ehf_lf >= self.ehf_lf_min || m.sc >= self.sc_min_hz,
                ),
                (RulePredicate::ProsodyRange, m.prosody >= self.prosody_min_semitones),
                (RulePredicate::Reserved, true),
            ],
            self.count_placeholder,
        )
    }
}

impl HighF0Rules {
    fn evaluate(&self, m: &Measurements) -> RuleEvaluation {
        RuleEvaluation::from_checks(
            [
                (RulePredicate::FormantSpacing, m.delta_f <= self.delta_f_max_hz),
                (RulePredicate::TractLength, m.vtl >= self.vtl_min_cm),
                (RulePredicate::SecondFormant, m.f2 <= self.f2_max_hz),
                (RulePredicate::HarmonicDifference, m.h1h2 <= self.h1h2_max_db),
                (
                    RulePredicate::Brightness,
                    m.ehf_lf <= self.ehf_lf_max || m.sc <= self.sc_max_hz,
                ),
                (RulePredicate::ProsodyRange, m.prosody <= self.prosody_max_semitones),
                (RulePredicate::Reserved, true),
            ],
            self.count_placeholder,
        )
    }
}

/// Everything the window analyzer needs from the session configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowSettings {
    pub bands: BandsConfig,
    pub f0_zone: F0ZoneConfig,
    pub low_rules: LowF0Rules,
    pub high_rules: HighF0Rules,
    pub pitch_range: PitchRange,
}

/// Rule-set outcome for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowDecision {
    pub low_count: usize,
    pub high_count: usize,
    pub low_f0_hit: bool,
    pub high_f0_hit: bool,
}

/// Features of one closed analysis window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowFeatures {
    /// Tracked F0 values accepted during the window
    pub f0_track: Vec<f32>,
    /// Median tracked F0, 0 when none
    pub f0_median: f32,
    pub f1: f32,
    pub f2: f32,
    pub f3: f32,
    /// Average formant spacing, Hz (>= 1)
    pub delta_f: f32,
    /// Tract length from formant spacing, cm
    pub vtl_delta_f: f32,
    /// Median of per-formant quarter-wavelength tract lengths, cm
    pub vtl_formant_mean: f32,
    pub h1_minus_h2: f32,
    /// High/low band energy ratio; +inf when only the high band has energy,
    /// 0 for a window with no energy in either band
    pub ehf_over_elf: f32,
    pub spectral_centroid: f32,
    pub prosody_range_st: f32,
    /// Mean pitch score of the tracked F0 values
    pub avg_pitch01: f32,
    /// Mean tracked resonance, 0.5 when none
    pub avg_resonance01: f32,
    pub low_rules: RuleEvaluation,
    pub high_rules: RuleEvaluation,
    pub decision: WindowDecision,
}

/// Per-frame values handed to the window analyzer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameObservation {
    /// Smoothed F0
    pub f0_hz: f32,
    pub confidence: f32,
    pub f1: f32,
    pub f2: f32,
    pub f3: f32,
    pub resonance01: f32,
}

impl FrameObservation {
    /// Observation carrying nothing trackable
    pub fn unvoiced() -> Self {
        Self {
            f0_hz: 0.0,
            confidence: 0.0,
            f1: 0.0,
            f2: 0.0,
            f3: 0.0,
            resonance01: f32::NAN,
        }
    }
}

/// Analyzer state between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerState {
    Accumulating,
    WindowReady,
}

/// Sliding-window feature aggregator
pub struct SpectralWindowAnalyzer {
    sample_rate: u32,
    window_samples: usize,
    hop_samples: usize,
    settings: WindowSettings,
    fft: FftProcessor,
    buffer: Vec<f32>,
    f0_track: Vec<f32>,
    f1_track: Vec<f32>,
    f2_track: Vec<f32>,
    f3_track: Vec<f32>,
    resonance_track: Vec<f32>,
}

impl SpectralWindowAnalyzer {
    pub fn new(sample_rate: u32, settings: WindowSettings) -> Self {
        let window_samples = ((sample_rate as u64 * WINDOW_MS as u64 / 1000) as usize).max(1);
        let hop_samples = ((sample_rate as u64 * HOP_MS as u64 / 1000) as usize).max(1);
        Self {
            sample_rate,
            window_samples,
            hop_samples,
            settings,
            fft: FftProcessor::new(PSD_FFT_SIZE),
            buffer: Vec::with_capacity(window_samples * 2),
            f0_track: Vec::new(),
            f1_track: Vec::new(),
            f2_track: Vec::new(),
            f3_track: Vec::new(),
            resonance_track: Vec::new(),
        }
    }

    pub fn window_samples(&self) -> usize {
        self.window_samples
    }

    pub fn hop_samples(&self) -> usize {
        self.hop_samples
    }

    pub fn state(&self) -> AnalyzerState {
        if self.buffer.len() >= self.window_samples {
            AnalyzerState::WindowReady
        } else {
            AnalyzerState::Accumulating
        }
    }

    /// Append one frame; every window closed by it is passed to `on_window`.
    ///
    /// Returns the number of windows emitted.
    pub fn push_frame<F>(&mut self, samples: &[f32], obs: &FrameObservation, mut on_window: F) -> usize
    where
        F: FnMut(WindowFeatures),
    {
        self.buffer.extend_from_slice(samples);

        if obs.confidence > MIN_TRACK_CONFIDENCE && (MIN_F0_HZ..=MAX_F0_HZ).contains(&obs.f0_hz) {
            self.f0_track.push(obs.f0_hz);
        }
        if obs.f1 > 0.0 && obs.f2 > 0.0 && obs.f3 > 0.0 {
            self.f1_track.push(obs.f1);
            self.f2_track.push(obs.f2);
            self.f3_track.push(obs.f3);
        }
        if (0.0..=1.0).contains(&obs.resonance01) {
            self.resonance_track.push(obs.resonance01);
        }

        let mut emitted = 0;
        while self.state() == AnalyzerState::WindowReady {
            let features = self.analyze_window();
            on_window(features);
            emitted += 1;

            let consumed = self.hop_samples.min(self.buffer.len());
            self.buffer.drain(..consumed);
            self.clear_tracks();
        }
        emitted
    }

    /// Drop buffered audio and per-window tracks
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.clear_tracks();
    }

    fn clear_tracks(&mut self) {
        self.f0_track.clear();
        self.f1_track.clear();
        self.f2_track.clear();
        self.f3_track.clear();
        self.resonance_track.clear();
    }

    fn analyze_window(&mut self) -> WindowFeatures {
        let half = PSD_FFT_SIZE / 2;
        let window = &self.buffer[..self.window_samples];
        let psd = self
            .fft
            .averaged_power_spectrum(window)
            .unwrap_or_else(|| vec![0.0; half]);
        let hz_per_bin = self.fft.hz_per_bin(self.sample_rate);

        let (ehf_over_elf, spectral_centroid) = band_energies(&psd, hz_per_bin, &self.settings.bands);

        let f0_median = median(&self.f0_track).unwrap_or(0.0);
        let h1_minus_h2 = if f0_median > 0.0 {
            peak_db_near(&psd, f0_median, hz_per_bin) - peak_db_near(&psd, 2.0 * f0_median, hz_per_bin)
        } else {
            0.0
        };

        let f1 = median(&self.f1_track).unwrap_or(FALLBACK_FORMANTS[0]);
        let f2 = median(&self.f2_track).unwrap_or(FALLBACK_FORMANTS[1]);
        let f3 = median(&self.f3_track).unwrap_or(FALLBACK_FORMANTS[2]);
        let (delta_f, vtl_delta_f, vtl_formant_mean) = tract_length([f1, f2, f3]);

        let prosody_range_st = prosody_range(&self.f0_track);

        let range = self.settings.pitch_range;
        let pitch_scores: Vec<f32> = self.f0_track.iter().map(|&f| range.score(f)).collect();
        let avg_pitch01 = mean(&pitch_scores).map(clamp01).unwrap_or(0.0);
        let avg_resonance01 = mean(&self.resonance_track).map(clamp01).unwrap_or(0.5);

        let m = Measurements {
            delta_f,
            vtl: vtl_delta_f,
            f2,
            h1h2: h1_minus_h2,
            ehf_lf: ehf_over_elf,
            sc: spectral_centroid,
            prosody: prosody_range_st,
        };
        let low_rules = self.settings.low_rules.evaluate(&m);
        let high_rules = self.settings.high_rules.evaluate(&m);

        // An untracked window has f0_median 0 and falls in the low band
        let zone = &self.settings.f0_zone;
        let decision = WindowDecision {
            low_count: low_rules.count(),
            high_count: high_rules.count(),
            low_f0_hit: f0_median <= zone.low_max_hz
                && low_rules.count() >= self.settings.low_rules.min_satisfied,
            high_f0_hit: f0_median > 0.0
                && f0_median >= zone.high_min_hz
                && high_rules.count() >= self.settings.high_rules.min_satisfied,
        };

        WindowFeatures {
            f0_track: self.f0_track.clone(),
            f0_median,
            f1,
            f2,
            f3,
            delta_f,
            vtl_delta_f,
            vtl_formant_mean,
            h1_minus_h2,
            ehf_over_elf,
            spectral_centroid,
            prosody_range_st,
            avg_pitch01,
            avg_resonance01,
            low_rules,
            high_rules,
            decision,
        }
    }
}

/// EHF/LF ratio and spectral centroid over bins `1..=sc_max`.
///
/// A window with no energy in either band reports a ratio of 0.
fn band_energies(psd: &[f32], hz_per_bin: f32, bands: &BandsConfig) -> (f32, f32) {
    let last = psd.len().saturating_sub(1);
    if last == 0 || hz_per_bin <= 0.0 {
        return (0.0, 0.0);
    }
    let split_bin = ((bands.split_hz / hz_per_bin) as usize).clamp(1, last);
    let sc_max_bin = ((bands.sc_max_hz / hz_per_bin) as usize).min(last);

    let (mut low, mut high, mut num, mut den) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (k, &p) in psd.iter().enumerate().take(sc_max_bin + 1).skip(1) {
        let p = p as f64;
        if k <= split_bin {
            low += p;
        } else {
            high += p;
        }
        num += k as f64 * hz_per_bin as f64 * p;
        den += p;
    }

    let ratio = if low > ENERGY_EPSILON {
        (high / low) as f32
    } else if high > ENERGY_EPSILON {
        f32::INFINITY
    } else {
        0.0
    };
    let centroid = if den > 0.0 { (num / den) as f32 } else { 0.0 };
    (ratio, centroid)
}

/// Interpolated log-power peak near `target_hz`, in dB
fn peak_db_near(psd: &[f32], target_hz: f32, hz_per_bin: f32) -> f32 {
    if psd.len() < 3 {
        return 0.0;
    }
    let idx = ((target_hz / hz_per_bin).round() as usize).clamp(1, psd.len() - 2);
    let ln_power = |i: usize| (psd[i] as f64).max(LOG_POWER_FLOOR).ln();
    let (y1, y2, y3) = (ln_power(idx - 1), ln_power(idx), ln_power(idx + 1));
    let denom = y1 - 2.0 * y2 + y3;
    let shift = if denom.abs() > 1e-6 { 0.5 * (y1 - y3) / denom } else { 0.0 };
    let peak = y2 - 0.25 * (y1 - y3) * shift;
    (10.0 * peak / std::f64::consts::LN_10) as f32
}

/// `(deltaF, vtl from deltaF, median per-formant vtl)`
fn tract_length(formants: [f32; 3]) -> (f32, f32, f32) {
    let [f1, f2, f3] = formants;
    let delta_f = (((f2 - f1) + (f3 - f2)) / 2.0).max(1.0);
    let vtl_delta_f = SPEED_OF_SOUND_CM_S / (2.0 * delta_f);

    let per_formant: Vec<f32> = formants
        .iter()
        .enumerate()
        .map(|(i, &f)| (2 * i + 1) as f32 * SPEED_OF_SOUND_CM_S / (4.0 * f))
        .collect();
    let vtl_formant_mean = match median(&per_formant) {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => vtl_delta_f,
    };
    (delta_f, vtl_delta_f, vtl_formant_mean)
}

/// Pitch excursion in semitones, 0 with fewer than two tracked values
fn prosody_range(f0_track: &[f32]) -> f32 {
    if f0_track.len() < 2 {
        return 0.0;
    }
    let max = f0_track.iter().copied().fold(f32::MIN, f32::max);
    let min = f0_track.iter().copied().fold(f32::MAX, f32::min);
    if max > 0.0 && min > 0.0 {
        12.0 * (max / min).log2()
    } else {
        0.0
    }
}

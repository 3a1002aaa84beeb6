// src/core/analyzer.rs
//
// Offline analysis of recordings with builder pattern.
// Frames go through the same pitch/formant path as the live loop; every
// closed window is scored from its rule counts and classified.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

use super::analysis::{
    compute_brightness, FormantEstimator, FrameObservation, Hysteresis, PitchDetector,
    SpectralWindowAnalyzer, WindowFeatures, HOP_MS,
};
use super::decoder::decode_mono;
use super::dsp::{Ema, HannCache};
use crate::config::AnalysisConfig;
use crate::report::{AnalysisReport, WindowReport, ZoneSummary};

/// Frame length used for offline analysis
pub const OFFLINE_FRAME_SIZE: usize = 2048;
/// Minimum pitch confidence for a frame to reach the window analyzer
pub const OFFLINE_MIN_CONFIDENCE: f32 = 0.45;
/// Window F0 is clamped to this band before pitch scoring
pub const SCORE_F0_CLAMP_HZ: (f32, f32) = (80.0, 300.0);

const TRACK_EMA_ALPHA: f32 = 0.15;

/// Builder for VoiceFileAnalyzer configuration
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
    frame_size: usize,
    include_brightness: bool,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            frame_size: OFFLINE_FRAME_SIZE,
            include_brightness: false,
        }
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size.max(1);
        self
    }

    /// Report the brightness composite of every window
    pub fn include_brightness(mut self, include: bool) -> Self {
        self.include_brightness = include;
        self
    }

    pub fn build(self) -> VoiceFileAnalyzer {
        VoiceFileAnalyzer {
            config: self.config,
            frame_size: self.frame_size,
            include_brightness: self.include_brightness,
        }
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Offline analyzer for decoded audio or audio files
pub struct VoiceFileAnalyzer {
    config: AnalysisConfig,
    frame_size: usize,
    include_brightness: bool,
}

impl Default for VoiceFileAnalyzer {
    fn default() -> Self {
        AnalyzerBuilder::new().build()
    }
}

impl VoiceFileAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        AnalyzerBuilder::new().config(config).build()
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Decode and analyse a file
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisReport> {
        let audio = decode_mono(path)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        info!(
            "Analysing {} ({:.1}s, {} Hz)",
            path.display(),
            audio.duration_secs,
            audio.sample_rate
        );
        let mut report = self.analyze_samples(&audio.samples, audio.sample_rate);
        report.file = Some(path.display().to_string());
        Ok(report)
    }

    /// Analyse mono samples
    pub fn analyze_samples(&self, samples: &[f32], sample_rate: u32) -> AnalysisReport {
        let (windows, frames_analyzed, voiced_frames) = self.collect_windows(samples, sample_rate);
        debug!(
            "{} frames, {} voiced, {} windows",
            frames_analyzed,
            voiced_frames,
            windows.len()
        );

        let cfg = &self.config;
        let pitch_range = cfg.pitch_range();
        let clip = cfg.gradient_clip;
        let hop_s = HOP_MS as f64 / 1000.0;
        let mut hysteresis = Hysteresis::new(cfg.hysteresis_windows);

        let reports: Vec<WindowReport> = windows
            .iter()
            .enumerate()
            .map(|(i, wf)| {
                let g = wf.decision.low_count as f32 - wf.decision.high_count as f32 + cfg.bias;
                let x = ((g + clip) / (2.0 * clip)).clamp(0.0, 1.0);
                let (lo, hi) = SCORE_F0_CLAMP_HZ;
                let y = pitch_range.score(wf.f0_median.clamp(lo, hi));
                let zone = cfg.zone_policy.classify(x, y);
                let stable_zone = hysteresis.push(zone);
                let brightness = self
                    .include_brightness
                    .then(|| compute_brightness(&cfg.placement.resonance_axis, wf).composite);
                WindowReport {
                    g,
                    norm_pitch_y: y,
                    norm_score_x: x,
                    zone,
                    stable_zone,
                    brightness,
                    ..WindowReport::from_features(i as f64 * hop_s, wf)
                }
            })
            .collect();

        let summary = ZoneSummary::from_zones(reports.iter().map(|r| r.zone));
        AnalysisReport {
            file: None,
            sample_rate,
            duration_secs: if sample_rate > 0 {
                samples.len() as f64 / sample_rate as f64
            } else {
                0.0
            },
            frames_analyzed,
            voiced_frames,
            zone_policy: cfg.zone_policy.name().to_string(),
            pitch_range,
            windows: reports,
            summary,
        }
    }

    /// Run the frame loop; returns closed windows, frame count and voiced frame count
    fn collect_windows(&self, samples: &[f32], sample_rate: u32) -> (Vec<WindowFeatures>, usize, usize) {
        let mut windows = Vec::new();
        if sample_rate == 0 {
            return (windows, 0, 0);
        }

        let mut taper = HannCache::new();
        let mut pitch = PitchDetector::new();
        let mut formants = FormantEstimator::new(self.config.formant_reference());
        let mut analyzer = SpectralWindowAnalyzer::new(sample_rate, self.config.window_settings());
        let mut f0_ema = Ema::new(TRACK_EMA_ALPHA);
        let mut res_ema = Ema::new(TRACK_EMA_ALPHA);
        let (mut frames, mut voiced) = (0usize, 0usize);

        for frame in samples.chunks(self.frame_size) {
            frames += 1;
            let estimate = pitch.detect(frame, sample_rate);
            let tapered = taper.apply(frame);
            let formant = formants.estimate(&tapered, sample_rate, Some(estimate.f0_hz));
            if !(estimate.is_voiced() && estimate.confidence > OFFLINE_MIN_CONFIDENCE) {
                continue;
            }
            voiced += 1;
            let observation = FrameObservation {
                f0_hz: f0_ema.update(estimate.f0_hz),
                confidence: estimate.confidence,
                f1: formant.f1,
                f2: formant.f2,
                f3: formant.f3,
                resonance01: res_ema.update(formant.resonance01),
            };
            analyzer.push_frame(&tapered, &observation, |w| windows.push(w));
        }
        (windows, frames, voiced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testgen::{generate_silence, synth_vowel, VowelSpec};

    #[test]
    fn test_silence_yields_no_windows() {
        let analyzer = VoiceFileAnalyzer::default();
        let report = analyzer.analyze_samples(&generate_silence(22050, 2.0), 22050);
        assert!(report.windows.is_empty());
        assert_eq!(report.voiced_frames, 0);
        assert_eq!(report.summary, ZoneSummary::default());
        assert_eq!(report.final_zone(), None);
    }

    #[test]
    fn test_voiced_signal_produces_scored_windows() {
        let analyzer = VoiceFileAnalyzer::builder().include_brightness(true).build();
        let voice = synth_vowel(&VowelSpec::male_a(), 22050, 22050 * 3, 0.5);
        let report = analyzer.analyze_samples(&voice, 22050);

        assert!(report.voiced_ratio() > 0.5);
        assert!(!report.windows.is_empty());
        for (i, w) in report.windows.iter().enumerate() {
            assert!((w.time_s - i as f64 * 0.25).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&w.norm_score_x));
            assert!((0.0..=1.0).contains(&w.norm_pitch_y));
            assert!(w.brightness.is_some());
            assert!(w.delta_f >= 1.0);
        }
        let total = report.summary.female_percent
            + report.summary.androgynous_percent
            + report.summary.male_percent;
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_maps_to_score_x() {
        let analyzer = VoiceFileAnalyzer::default();
        let voice = synth_vowel(&VowelSpec::male_a(), 22050, 22050 * 2, 0.5);
        let report = analyzer.analyze_samples(&voice, 22050);
        for w in &report.windows {
            let expected = ((w.s_female as f32 - w.s_male as f32 + 0.35) / 0.7).clamp(0.0, 1.0);
            assert!((w.norm_score_x - expected).abs() < 1e-6);
            assert!((w.g - (w.s_female as f32 - w.s_male as f32)).abs() < 1e-6);
        }
        if let Some(first) = report.windows.first() {
            let expected = analyzer.config().zone_policy.classify(first.norm_score_x, first.norm_pitch_y);
            assert_eq!(first.zone, expected);
            assert_eq!(first.stable_zone, expected);
        }
    }
}

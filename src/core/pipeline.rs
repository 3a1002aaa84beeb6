// src/core/pipeline.rs
//
// Live frame loop.
// Frames flow synchronously through pitch detection, an adaptive noise gate,
// formant estimation, smoothing, X placement, classification and the window
// analyzer. Results are delivered as events to a caller-supplied callback.

use log::{debug, trace};
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::core::analysis::{
    Brightness, Category, FormantEstimate, FormantEstimator, FrameObservation, Hysteresis,
    PitchDetector, PitchRange, ResonancePlacer, SpectralWindowAnalyzer, WindowFeatures, ZonePolicy,
};
use crate::core::dsp::{rms, Ema, HannCache};

/// Frames below this pitch confidence only update the noise floor
pub const GATE_CONFIDENCE: f32 = 0.45;
/// Voiced frames must exceed the noise baseline by this factor
pub const GATE_RATIO: f32 = 1.4;
/// Baseline as a fraction of frame RMS before any noise was observed
pub const BASELINE_FALLBACK_RATIO: f32 = 0.4;

const NOISE_EMA_ALPHA: f32 = 0.05;
const TRACK_EMA_ALPHA: f32 = 0.15;

/// Capture frame length used when slicing continuous audio
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Per-frame output of the live loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameResult {
    /// Smoothed F0
    pub f0_hz: f32,
    /// Smoothed resonance
    pub resonance01: f32,
    pub confidence: f32,
    pub pitch01: f32,
    /// Final resonance-axis position
    pub x01: f32,
    pub formants: FormantEstimate,
    pub brightness: Option<Brightness>,
    pub category: Category,
    pub stable_category: Category,
}

/// Events emitted while processing a frame
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Frame(FrameResult),
    Window(WindowFeatures),
}

/// What happened to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Pitch confidence too low; noise floor updated
    Unvoiced,
    /// Voiced but not loud enough above the noise floor
    Gated,
    /// Detector reported no F0
    NoPitch,
    /// Results emitted
    Voiced,
}

/// Synchronous per-session analysis loop
pub struct VoicePipeline {
    sample_rate: u32,
    pitch_range: PitchRange,
    policy: ZonePolicy,
    taper: HannCache,
    pitch: PitchDetector,
    formants: FormantEstimator,
    windows: SpectralWindowAnalyzer,
    placer: ResonancePlacer,
    hysteresis: Hysteresis,
    noise_floor: Ema,
    f0_smoother: Ema,
    resonance_smoother: Ema,
    latest_window: Option<WindowFeatures>,
    frames_seen: u64,
}

impl VoicePipeline {
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Self {
        debug!(
            "Starting pipeline at {} Hz, policy {}, hysteresis {}",
            sample_rate,
            config.zone_policy.name(),
            config.hysteresis_windows
        );
        Self {
            sample_rate,
            pitch_range: config.pitch_range(),
            policy: config.zone_policy,
            taper: HannCache::new(),
            pitch: PitchDetector::new(),
            formants: FormantEstimator::new(config.formant_reference()),
            windows: SpectralWindowAnalyzer::new(sample_rate, config.window_settings()),
            placer: ResonancePlacer::new(config.placement.clone()),
            hysteresis: Hysteresis::new(config.hysteresis_windows),
            noise_floor: Ema::new(NOISE_EMA_ALPHA),
            f0_smoother: Ema::new(TRACK_EMA_ALPHA),
            resonance_smoother: Ema::new(TRACK_EMA_ALPHA),
            latest_window: None,
            frames_seen: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Most recently closed window
    pub fn latest_window(&self) -> Option<&WindowFeatures> {
        self.latest_window.as_ref()
    }

    /// Current stable category, if any result has been produced
    pub fn stable_category(&self) -> Option<Category> {
        self.hysteresis.stable()
    }

    /// Process one capture frame.
    ///
    /// The frame result (if any) is emitted before the windows it closes;
    /// X placement uses the window closed by an earlier frame.
    pub fn process_frame<F>(&mut self, samples: &[f32], mut on_event: F) -> FrameStatus
    where
        F: FnMut(PipelineEvent),
    {
        self.frames_seen += 1;
        if samples.is_empty() {
            return FrameStatus::Unvoiced;
        }

        let level = rms(samples);
        let estimate = self.pitch.detect(samples, self.sample_rate);

        if estimate.confidence < GATE_CONFIDENCE {
            self.noise_floor.update(level);
            return FrameStatus::Unvoiced;
        }
        let baseline = self
            .noise_floor
            .value()
            .filter(|&v| v > 0.0)
            .unwrap_or(level * BASELINE_FALLBACK_RATIO);
        if level < baseline * GATE_RATIO {
            trace!("Frame {} gated: rms {:.4} < {:.4}", self.frames_seen, level, baseline * GATE_RATIO);
            return FrameStatus::Gated;
        }

        let tapered = self.taper.apply(samples);
        let formants = self
            .formants
            .estimate(&tapered, self.sample_rate, Some(estimate.f0_hz));
        if !estimate.is_voiced() {
            return FrameStatus::NoPitch;
        }

        let f0_hz = self.f0_smoother.update(estimate.f0_hz);
        let resonance01 = self.resonance_smoother.update(formants.resonance01);
        let pitch01 = self.pitch_range.score(f0_hz);

        let placement = self
            .placer
            .place(resonance01, f0_hz, pitch01, self.latest_window.as_ref());
        let category = self.policy.classify(placement.x01, pitch01);
        let stable_category = self.hysteresis.push(category);

        on_event(PipelineEvent::Frame(FrameResult {
            f0_hz,
            resonance01,
            confidence: estimate.confidence,
            pitch01,
            x01: placement.x01,
            formants,
            brightness: placement.brightness,
            category,
            stable_category,
        }));

        let observation = FrameObservation {
            f0_hz,
            confidence: estimate.confidence,
            f1: formants.f1,
            f2: formants.f2,
            f3: formants.f3,
            resonance01,
        };
        let mut closed = Vec::new();
        self.windows
            .push_frame(&tapered, &observation, |w| closed.push(w));
        for window in closed {
            debug!(
                "Window closed: f0 {:.1} Hz, low hits {}, high hits {}",
                window.f0_median, window.decision.low_count, window.decision.high_count
            );
            self.latest_window = Some(window.clone());
            on_event(PipelineEvent::Window(window));
        }

        FrameStatus::Voiced
    }

    /// Slice continuous audio into frames of `frame_size` and process each.
    ///
    /// A trailing partial frame is dropped.
    pub fn process_samples<F>(&mut self, samples: &[f32], frame_size: usize, mut on_event: F)
    where
        F: FnMut(PipelineEvent),
    {
        for frame in samples.chunks_exact(frame_size.max(1)) {
            self.process_frame(frame, &mut on_event);
        }
    }

    /// Clear smoothing state, buffered audio and the hysteresis history
    pub fn reset(&mut self) {
        self.formants.reset();
        self.windows.reset();
        self.placer.reset();
        self.hysteresis.reset();
        self.noise_floor.reset();
        self.f0_smoother.reset();
        self.resonance_smoother.reset();
        self.latest_window = None;
        self.frames_seen = 0;
    }
}

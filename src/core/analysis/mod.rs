//! Voice analysis algorithms
//!
//! Contains the per-frame and per-window stages of the analysis:
//! - Pitch detection and pitch scoring
//! - LPC formant estimation and the resonance z-score
//! - Windowed spectral features and the two rule sets
//! - Composite brightness mapping
//! - Zone classification with hysteresis
//! - Resonance-axis placement stages

mod brightness;
mod classifier;
mod formant;
mod pitch;
mod placement;
mod window;

pub use brightness::{
    compute_brightness, Brightness, BrightnessComponents, DarkGate, NonlinearConfig,
    ResonanceAxisConfig, ResonanceRanges, ResonanceWeights, ReshapeKind, ReshapeSpec,
};
pub use classifier::{
    classify, Anchor, Category, Hysteresis, ZonePolicy, ANDROGYNOUS_PROXIMITY_RATIO,
};
pub use formant::{
    FormantEstimate, FormantEstimator, FormantReference, FormantStat, PhonemeFormants,
    FALLBACK_FORMANTS,
};
pub use pitch::{GroupPitchStats, PitchDetector, PitchEstimate, PitchRange, MAX_F0_HZ, MIN_F0_HZ};
pub use placement::{
    BiasDynamicConfig, Comparison, Condition, ConditionGroup, FloorRule, Metric, Placement,
    PlacementConfig, ResonancePlacer, SigmoidParams,
};
pub use window::{
    AnalyzerState, BandsConfig, F0ZoneConfig, FrameObservation, HighF0Rules, LowF0Rules,
    RuleEvaluation, RulePredicate, SpectralWindowAnalyzer, WindowDecision, WindowFeatures,
    WindowSettings, HOP_MS, SPEED_OF_SOUND_CM_S, WINDOW_MS,
};

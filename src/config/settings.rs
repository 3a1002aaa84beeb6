// src/config/settings.rs
//
// Session configuration.
// A deeply optional JSON document is resolved once into an immutable
// `AnalysisConfig`; nothing downstream re-reads raw configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::analysis::{
    Anchor, BandsConfig, BiasDynamicConfig, ConditionGroup, DarkGate, F0ZoneConfig, FloorRule,
    FormantReference, FormantStat, GroupPitchStats, HighF0Rules, LowF0Rules, NonlinearConfig,
    PhonemeFormants, PitchRange, PlacementConfig, ResonanceAxisConfig, ResonanceRanges,
    ResonanceWeights, SigmoidParams, WindowSettings, ZonePolicy,
};

/// Default rule-gradient clip for the offline score
pub const DEFAULT_GRADIENT_CLIP: f32 = 0.35;
/// Default hysteresis window, in results
pub const DEFAULT_HYSTERESIS_WINDOWS: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration section `{0}`")]
    MissingSection(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A resolved value and whether it came from the document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum Setting<T> {
    Provided(T),
    Defaulted(T),
}

impl<T> Setting<T> {
    pub fn value(&self) -> &T {
        match self {
            Setting::Provided(v) | Setting::Defaulted(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Setting::Provided(v) | Setting::Defaulted(v) => v,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Setting::Provided(_))
    }
}

impl<T: Default> Default for Setting<T> {
    fn default() -> Self {
        Setting::Defaulted(T::default())
    }
}

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    pub bands: Option<BandsConfig>,
    pub f0_zone: Option<F0ZoneConfig>,
    pub zones: Option<RawZones>,
    pub score: Option<RawScore>,
    pub zones_diagonal: Option<RawZonesDiagonal>,
    pub ui_lines: Option<RawUiLines>,
    #[serde(rename = "rules_female_lowF0")]
    pub rules_female_low_f0: Option<LowF0Rules>,
    #[serde(rename = "rules_male_highF0")]
    pub rules_male_high_f0: Option<HighF0Rules>,
    pub resonance_axis: Option<RawResonanceAxis>,
    pub mapping: Option<RawMapping>,
    pub voice_stats: Option<RawVoiceStats>,
    pub formant_reference: Option<RawFormantReference>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawZones {
    pub bias: f32,
    pub male_max: f32,
    pub female_min: f32,
    pub gradient_clip: f32,
    pub hysteresis_windows: usize,
}

impl Default for RawZones {
    fn default() -> Self {
        Self {
            bias: 0.0,
            male_max: -0.2,
            female_min: 0.08,
            gradient_clip: DEFAULT_GRADIENT_CLIP,
            hysteresis_windows: DEFAULT_HYSTERESIS_WINDOWS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScore {
    pub bias: f32,
    pub gradient_clip: f32,
    pub hysteresis_windows: usize,
    pub bias_dynamic: Option<RawBiasDynamic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBiasDynamic {
    #[serde(default)]
    pub enabled: bool,
    pub f0_low_hz: Option<f32>,
    pub f0_high_hz: Option<f32>,
    #[serde(rename = "scale_vtl_dF")]
    pub scale_vtl_df: Option<f32>,
    pub params: Option<RawBiasParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBiasParams {
    pub y_low: Option<SigmoidParams>,
    pub k1: Option<f32>,
    pub k2: Option<f32>,
    pub geom_male: Option<ConditionGroup>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawZonesDiagonal {
    pub y_norm_f0_min_hz: f32,
    pub y_norm_f0_max_hz: f32,
    pub male_max_base: f32,
    pub male_max_slope: f32,
    pub andro_high_base: f32,
    pub andro_high_slope: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawUiLines {
    pub bias: Option<f32>,
    pub male_base: f32,
    pub male_slope: f32,
    pub andro_high_base: f32,
    pub andro_high_slope: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResonanceAxis {
    #[serde(default)]
    pub use_brightness_for_x: bool,
    pub weights: ResonanceWeights,
    pub ranges: ResonanceRanges,
    #[serde(default)]
    pub hf_lf_log10: bool,
    pub overrides: Option<RawOverrides>,
    pub gain_x: Option<f32>,
    pub nonlinear: Option<NonlinearConfig>,
    pub hard_floor: Option<RawHardFloor>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawOverrides {
    pub dark_gate: Option<DarkGate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHardFloor {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub x_min_when: Vec<FloorRule>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawAnchors {
    pub male: RawPoint,
    pub female: RawPoint,
}

/// Radii shared by both anchors
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawRadii {
    pub rx: f32,
    pub ry: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPitchRange {
    pub f0_min_hz: f32,
    pub f0_max_hz: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawMapping {
    pub pitch_range: Option<RawPitchRange>,
    pub anchors: Option<RawAnchors>,
    pub ellipse_radii: Option<RawRadii>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawVoiceStats {
    pub female: GroupPitchStats,
    pub male: GroupPitchStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFormantReference {
    pub f2: Option<FormantStat>,
    pub f3: Option<FormantStat>,
    pub phonemes: Option<HashMap<String, PhonemeFormants>>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved, immutable configuration of one analysis session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub bands: BandsConfig,
    pub f0_zone: F0ZoneConfig,
    pub low_rules: LowF0Rules,
    pub high_rules: HighF0Rules,
    pub pitch_range: Setting<PitchRange>,
    /// Shift of the zone centre and of the rule gradient
    pub bias: f32,
    pub gradient_clip: f32,
    pub hysteresis_windows: usize,
    pub zone_policy: ZonePolicy,
    pub placement: PlacementConfig,
    pub formant_reference: Setting<FormantReference>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bands: BandsConfig::default(),
            f0_zone: F0ZoneConfig::default(),
            low_rules: LowF0Rules::default(),
            high_rules: HighF0Rules::default(),
            pitch_range: Setting::default(),
            bias: 0.0,
            gradient_clip: DEFAULT_GRADIENT_CLIP,
            hysteresis_windows: DEFAULT_HYSTERESIS_WINDOWS,
            zone_policy: ZonePolicy::default(),
            placement: PlacementConfig::default(),
            formant_reference: Setting::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and resolve a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        raw.resolve()
    }

    /// Read, parse and resolve a JSON file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loading configuration from {}", path.display());
        Self::from_json_str(&text)
    }

    pub fn pitch_range(&self) -> PitchRange {
        *self.pitch_range.value()
    }

    pub fn formant_reference(&self) -> FormantReference {
        *self.formant_reference.value()
    }

    /// Settings handed to the window analyzer
    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            bands: self.bands,
            f0_zone: self.f0_zone,
            low_rules: self.low_rules,
            high_rules: self.high_rules,
            pitch_range: self.pitch_range(),
        }
    }

    /// Reject values that would make the analysis meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("bands.split_hz", self.bands.split_hz)?;
        check_finite("bands.sc_max_hz", self.bands.sc_max_hz)?;
        if !(self.bands.split_hz > 0.0 && self.bands.sc_max_hz > self.bands.split_hz) {
            return Err(ConfigError::invalid(
                "bands",
                "expected 0 < split_hz < sc_max_hz",
            ));
        }
        check_finite("f0_zone.low_max_hz", self.f0_zone.low_max_hz)?;
        check_finite("f0_zone.high_min_hz", self.f0_zone.high_min_hz)?;
        check_finite("bias", self.bias)?;
        check_finite("gradient_clip", self.gradient_clip)?;
        if self.gradient_clip <= 0.0 {
            return Err(ConfigError::invalid("gradient_clip", "must be positive"));
        }
        if self.hysteresis_windows == 0 {
            return Err(ConfigError::invalid("hysteresis_windows", "must be at least 1"));
        }

        let axis = &self.placement.resonance_axis;
        if !axis.weights.is_finite() {
            return Err(ConfigError::invalid("resonance_axis.weights", "non-finite weight"));
        }
        check_finite("resonance_axis.gain_x", axis.gain)?;
        let r = &axis.ranges;
        for (field, lo, hi) in [
            ("resonance_axis.ranges.hf_lf", r.hf_lf_min, r.hf_lf_max),
            ("resonance_axis.ranges.sc", r.sc_min_hz, r.sc_max_hz),
            ("resonance_axis.ranges.vtl", r.vtl_min_cm, r.vtl_max_cm),
            ("resonance_axis.ranges.deltaF", r.delta_f_min_hz, r.delta_f_max_hz),
            ("resonance_axis.ranges.h1h2", r.h1h2_min_db, r.h1h2_max_db),
        ] {
            check_range(field, lo, hi)?;
        }
        if r.vtl_min_cm <= 0.0 {
            return Err(ConfigError::invalid("resonance_axis.ranges.vtl", "must be positive"));
        }
        Ok(())
    }
}

fn check_finite(field: &str, v: f32) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is not finite", v)))
    }
}

fn check_range(field: &str, lo: f32, hi: f32) -> Result<(), ConfigError> {
    check_finite(field, lo)?;
    check_finite(field, hi)?;
    if lo < hi {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("inverted range [{}, {}]", lo, hi)))
    }
}

impl RawConfig {
    /// Resolve defaults and precedence into an `AnalysisConfig`
    pub fn resolve(self) -> Result<AnalysisConfig, ConfigError> {
        let bands = self.bands.ok_or(ConfigError::MissingSection("bands"))?;
        let f0_zone = self.f0_zone.ok_or(ConfigError::MissingSection("f0_zone"))?;
        let low_rules = self
            .rules_female_low_f0
            .ok_or(ConfigError::MissingSection("rules_female_lowF0"))?;
        let high_rules = self
            .rules_male_high_f0
            .ok_or(ConfigError::MissingSection("rules_male_highF0"))?;

        let zones = self.zones.unwrap_or_default();
        let (bias, gradient_clip, hysteresis_windows) = match &self.score {
            Some(s) => (s.bias, s.gradient_clip, s.hysteresis_windows),
            None => (zones.bias, zones.gradient_clip, zones.hysteresis_windows),
        };

        let zone_policy = self.resolve_policy(bias, &zones);
        debug!("Zone policy: {}", zone_policy.name());

        let config = AnalysisConfig {
            bands,
            f0_zone,
            low_rules,
            high_rules,
            pitch_range: self.resolve_pitch_range(),
            bias,
            gradient_clip,
            hysteresis_windows,
            zone_policy,
            placement: self.resolve_placement(),
            formant_reference: self.resolve_formant_reference(),
        };
        config.validate()?;
        Ok(config)
    }

    fn resolve_policy(&self, bias: f32, zones: &RawZones) -> ZonePolicy {
        if let Some(RawMapping {
            anchors: Some(a),
            ellipse_radii: Some(r),
            ..
        }) = self.mapping
        {
            let anchor = |p: RawPoint| Anchor {
                x: p.x,
                y: p.y,
                rx: r.rx,
                ry: r.ry,
            };
            return ZonePolicy::AnchorEllipse {
                male: anchor(a.male),
                female: anchor(a.female),
            };
        }
        if let Some(d) = &self.zones_diagonal {
            return ZonePolicy::Diagonal {
                bias,
                male_base: d.male_max_base,
                male_slope: d.male_max_slope,
                andro_high_base: d.andro_high_base,
                andro_high_slope: d.andro_high_slope,
            };
        }
        if let Some(ui) = &self.ui_lines {
            return ZonePolicy::Diagonal {
                bias: ui.bias.unwrap_or(bias),
                male_base: ui.male_base,
                male_slope: ui.male_slope,
                andro_high_base: ui.andro_high_base,
                andro_high_slope: ui.andro_high_slope,
            };
        }
        ZonePolicy::Static {
            bias,
            male_max: zones.male_max,
            female_min: zones.female_min,
        }
    }

    fn resolve_pitch_range(&self) -> Setting<PitchRange> {
        if let Some(stats) = &self.voice_stats {
            return Setting::Provided(PitchRange::from_group_stats(stats.female, stats.male));
        }
        if let Some(pr) = self.mapping.and_then(|m| m.pitch_range) {
            if pr.f0_min_hz.is_finite() && pr.f0_max_hz.is_finite() && pr.f0_max_hz > pr.f0_min_hz {
                return Setting::Provided(PitchRange::new(pr.f0_min_hz, pr.f0_max_hz));
            }
            warn!(
                "Ignoring mapping pitch range [{}, {}]",
                pr.f0_min_hz, pr.f0_max_hz
            );
        }
        if let Some(d) = &self.zones_diagonal {
            return Setting::Provided(PitchRange::new(d.y_norm_f0_min_hz, d.y_norm_f0_max_hz));
        }
        Setting::Defaulted(PitchRange::default())
    }

    fn resolve_placement(&self) -> PlacementConfig {
        let resonance_axis = match &self.resonance_axis {
            Some(ra) => ResonanceAxisConfig {
                use_brightness_for_x: ra.use_brightness_for_x,
                weights: ra.weights,
                ranges: ra.ranges,
                hf_lf_log10: ra.hf_lf_log10,
                nonlinear: ra.nonlinear.unwrap_or_default(),
                dark_gate: ra.overrides.and_then(|o| o.dark_gate),
                gain: ra.gain_x.unwrap_or(1.0),
            },
            None => ResonanceAxisConfig::default(),
        };

        let bias_dynamic = self
            .score
            .as_ref()
            .and_then(|s| s.bias_dynamic.as_ref())
            .filter(|bd| bd.enabled)
            .map(|bd| {
                let base = BiasDynamicConfig::default();
                let params = bd.params.as_ref();
                BiasDynamicConfig {
                    f0_low_hz: bd.f0_low_hz.unwrap_or(base.f0_low_hz),
                    f0_high_hz: bd.f0_high_hz.unwrap_or(base.f0_high_hz),
                    weight_scale: bd.scale_vtl_df.unwrap_or(base.weight_scale),
                    y_low: params.and_then(|p| p.y_low).unwrap_or(base.y_low),
                    k1: params.and_then(|p| p.k1).unwrap_or(base.k1),
                    k2: params.and_then(|p| p.k2).unwrap_or(base.k2),
                    geom_male: params.and_then(|p| p.geom_male.clone()),
                }
            });

        let hard_floor = self
            .resonance_axis
            .as_ref()
            .and_then(|ra| ra.hard_floor.as_ref())
            .filter(|hf| hf.enabled)
            .map(|hf| hf.x_min_when.clone())
            .unwrap_or_default();

        PlacementConfig {
            resonance_axis,
            bias_dynamic,
            hard_floor,
        }
    }

    fn resolve_formant_reference(&self) -> Setting<FormantReference> {
        let Some(raw) = &self.formant_reference else {
            return Setting::Defaulted(FormantReference::default());
        };
        if let Some(phonemes) = raw.phonemes.as_ref().filter(|p| !p.is_empty()) {
            return Setting::Provided(FormantReference::from_phonemes(phonemes));
        }
        let base = FormantReference::default();
        match (raw.f2, raw.f3) {
            (None, None) => Setting::Defaulted(base),
            (f2, f3) => Setting::Provided(FormantReference {
                f2: f2.unwrap_or(base.f2),
                f3: f3.unwrap_or(base.f3),
                ..base
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for programmatic configuration
pub struct ConfigBuilder {
    config: AnalysisConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    pub fn from_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn bands(mut self, bands: BandsConfig) -> Self {
        self.config.bands = bands;
        self
    }

    pub fn f0_zone(mut self, f0_zone: F0ZoneConfig) -> Self {
        self.config.f0_zone = f0_zone;
        self
    }

    pub fn low_rules(mut self, rules: LowF0Rules) -> Self {
        self.config.low_rules = rules;
        self
    }

    pub fn high_rules(mut self, rules: HighF0Rules) -> Self {
        self.config.high_rules = rules;
        self
    }

    pub fn pitch_range(mut self, range: PitchRange) -> Self {
        self.config.pitch_range = Setting::Provided(range);
        self
    }

    /// Set the rule-gradient bias and the zone centre of the current policy
    pub fn bias(mut self, bias: f32) -> Self {
        self.config.bias = bias;
        self.config.zone_policy.set_bias(bias);
        self
    }

    pub fn gradient_clip(mut self, clip: f32) -> Self {
        self.config.gradient_clip = clip;
        self
    }

    pub fn hysteresis_windows(mut self, windows: usize) -> Self {
        self.config.hysteresis_windows = windows;
        self
    }

    pub fn zone_policy(mut self, policy: ZonePolicy) -> Self {
        self.config.zone_policy = policy;
        self
    }

    pub fn resonance_axis(mut self, axis: ResonanceAxisConfig) -> Self {
        self.config.placement.resonance_axis = axis;
        self
    }

    pub fn bias_dynamic(mut self, bias_dynamic: Option<BiasDynamicConfig>) -> Self {
        self.config.placement.bias_dynamic = bias_dynamic;
        self
    }

    pub fn hard_floor(mut self, rules: Vec<FloorRule>) -> Self {
        self.config.placement.hard_floor = rules;
        self
    }

    pub fn formant_reference(mut self, reference: FormantReference) -> Self {
        self.config.formant_reference = Setting::Provided(reference);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

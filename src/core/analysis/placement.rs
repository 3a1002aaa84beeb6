// src/core/analysis/placement.rs
//
// Post-processing of the resonance (X) axis.
// Stages run in a fixed order on every frame result: brightness blend with
// low-F0 weight guard, global gain, bias-dynamic shift, hard floor.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::brightness::{compute_brightness, Brightness, ResonanceAxisConfig};
use super::window::WindowFeatures;
use crate::core::dsp::{clamp01, inv_sigmoid, std_dev};

/// Brightness values kept for the adaptive blend
pub const BRIGHTNESS_HISTORY: usize = 20;
const MIN_HISTORY_FOR_STD: usize = 5;
const EQ_TOLERANCE: f32 = 1e-3;

/// Quantity a condition is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "F0")]
    F0,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "EHF_LF")]
    EhfLf,
    #[serde(rename = "VTL")]
    Vtl,
    #[serde(rename = "deltaF")]
    DeltaF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=", alias = "=>")]
    Ge,
    #[serde(rename = "<=", alias = "=<")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
}

impl Comparison {
    pub fn holds(&self, lhs: f32, rhs: f32) -> bool {
        match self {
            Comparison::Ge => lhs >= rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Eq => (lhs - rhs).abs() < EQ_TOLERANCE,
        }
    }
}

/// `metric op value`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: Metric,
    pub op: Comparison,
    pub value: f32,
}

impl Condition {
    fn holds(&self, f0_hz: f32, window: &WindowFeatures) -> bool {
        let v = match self.metric {
            Metric::F0 => f0_hz,
            Metric::Sc => window.spectral_centroid,
            Metric::EhfLf => window.ehf_over_elf,
            Metric::Vtl => window.vtl_delta_f,
            Metric::DeltaF => window.delta_f,
        };
        self.op.holds(v, self.value)
    }
}

fn all_hold(conditions: &[Condition], f0_hz: f32, window: &WindowFeatures) -> bool {
    conditions.iter().all(|c| c.holds(f0_hz, window))
}

/// Conjunction scoring 1 when it holds and `otherwise` when it does not
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub all: Vec<Condition>,
    #[serde(default, rename = "else")]
    pub otherwise: f32,
}

/// Raise X to at least `x_min` when every condition holds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorRule {
    #[serde(default)]
    pub all: Vec<Condition>,
    #[serde(default)]
    pub x_min: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigmoidParams {
    pub k: f32,
    pub mid: f32,
}

impl Default for SigmoidParams {
    fn default() -> Self {
        Self { k: 8.0, mid: 0.30 }
    }
}

/// Pitch- and geometry-dependent shift towards the masculine side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasDynamicConfig {
    /// F0 band in which the VTL and ΔF brightness weights are scaled
    pub f0_low_hz: f32,
    pub f0_high_hz: f32,
    pub weight_scale: f32,
    pub y_low: SigmoidParams,
    pub k1: f32,
    pub k2: f32,
    pub geom_male: Option<ConditionGroup>,
}

impl Default for BiasDynamicConfig {
    fn default() -> Self {
        Self {
            f0_low_hz: 60.0,
            f0_high_hz: 150.0,
            weight_scale: 0.5,
            y_low: SigmoidParams::default(),
            k1: 0.10,
            k2: 0.10,
            geom_male: None,
        }
    }
}

impl BiasDynamicConfig {
    fn guards(&self, f0_hz: f32) -> bool {
        (self.f0_low_hz..=self.f0_high_hz).contains(&f0_hz)
    }

    fn shift(&self, pitch01: f32, window: Option<&WindowFeatures>, f0_hz: f32) -> f32 {
        let y_low = inv_sigmoid(pitch01, self.y_low.k, self.y_low.mid);
        let geom = match (window, &self.geom_male) {
            (Some(w), Some(group)) => {
                if all_hold(&group.all, f0_hz, w) {
                    1.0
                } else {
                    group.otherwise
                }
            }
            _ => 0.0,
        };
        self.k1 * y_low + self.k2 * geom
    }
}

/// Resolved configuration of all placement stages
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlacementConfig {
    pub resonance_axis: ResonanceAxisConfig,
    pub bias_dynamic: Option<BiasDynamicConfig>,
    /// Empty when the hard floor is disabled
    pub hard_floor: Vec<FloorRule>,
}

/// Final X position plus what produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x01: f32,
    /// Blend weight of the brightness composite, 0 when not used
    pub blend_alpha: f32,
    pub brightness: Option<Brightness>,
}

/// Stateful X-axis placer; keeps the recent brightness history
pub struct ResonancePlacer {
    config: PlacementConfig,
    history: VecDeque<f32>,
}

impl ResonancePlacer {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(BRIGHTNESS_HISTORY),
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Place one frame result on the X axis.
    ///
    /// `window` is the most recently closed window, if any.
    pub fn place(
        &mut self,
        resonance01: f32,
        f0_hz: f32,
        pitch01: f32,
        window: Option<&WindowFeatures>,
    ) -> Placement {
        let axis = &self.config.resonance_axis;

        let brightness = match window {
            Some(w) if axis.use_brightness_for_x => Some(self.brightness_for(f0_hz, w)),
            _ => None,
        };

        let mut blend_alpha = 0.0;
        let mut x = resonance01;
        if let Some(b) = &brightness {
            self.history.push_back(b.composite);
            while self.history.len() > BRIGHTNESS_HISTORY {
                self.history.pop_front();
            }
            blend_alpha = self.blend_alpha();
            x = blend_alpha * b.composite + (1.0 - blend_alpha) * resonance01;
        }

        let gain = self.config.resonance_axis.gain;
        if gain != 1.0 {
            x = clamp01(0.5 + gain * (x - 0.5));
        }

        if let Some(bias) = &self.config.bias_dynamic {
            x = clamp01(x - bias.shift(pitch01, window, f0_hz));
        }

        if let Some(w) = window {
            for rule in &self.config.hard_floor {
                if all_hold(&rule.all, f0_hz, w) {
                    x = x.max(rule.x_min);
                }
            }
        }

        Placement {
            x01: x,
            blend_alpha,
            brightness,
        }
    }

    fn brightness_for(&self, f0_hz: f32, window: &WindowFeatures) -> Brightness {
        let axis = &self.config.resonance_axis;
        match &self.config.bias_dynamic {
            Some(bias) if bias.guards(f0_hz) => {
                let mut guarded = axis.clone();
                guarded.weights.vtl_inv *= bias.weight_scale;
                guarded.weights.delta_f *= bias.weight_scale;
                compute_brightness(&guarded, window)
            }
            _ => compute_brightness(axis, window),
        }
    }

    fn blend_alpha(&mut self) -> f32 {
        if self.history.len() < MIN_HISTORY_FOR_STD {
            return 0.6;
        }
        match std_dev(self.history.make_contiguous()) {
            Some(s) if s < 0.03 => 0.2,
            Some(s) if s < 0.06 => 0.45,
            Some(_) => 0.7,
            None => 0.6,
        }
    }
}

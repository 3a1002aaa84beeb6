// src/core/analysis/brightness.rs
//
// Composite brightness/resonance score from window features.
// Five components are range-normalised, optionally reshaped by a logistic
// curve, weighted, summed and clamped; a dark-gate can cap the result.

use serde::{Deserialize, Serialize};

use super::window::WindowFeatures;
use crate::core::dsp::{clamp01, inv_sigmoid, normalize, sigmoid};

const LOG_EPSILON: f32 = 1e-6;

/// Component weights of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceWeights {
    pub hf_lf: f32,
    pub sc: f32,
    pub vtl_inv: f32,
    #[serde(rename = "deltaF")]
    pub delta_f: f32,
    #[serde(rename = "h1_h2")]
    pub h1h2: f32,
}

impl Default for ResonanceWeights {
    fn default() -> Self {
        Self {
            hf_lf: 0.55,
            sc: 0.25,
            vtl_inv: 0.10,
            delta_f: 0.05,
            h1h2: 0.05,
        }
    }
}

impl ResonanceWeights {
    pub fn is_finite(&self) -> bool {
        [self.hf_lf, self.sc, self.vtl_inv, self.delta_f, self.h1h2]
            .iter()
            .all(|w| w.is_finite())
    }
}

/// Raw-feature ranges mapped onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceRanges {
    pub hf_lf_min: f32,
    pub hf_lf_max: f32,
    pub sc_min_hz: f32,
    pub sc_max_hz: f32,
    pub vtl_min_cm: f32,
    pub vtl_max_cm: f32,
    #[serde(rename = "deltaF_min_hz")]
    pub delta_f_min_hz: f32,
    #[serde(rename = "deltaF_max_hz")]
    pub delta_f_max_hz: f32,
    pub h1h2_min_db: f32,
    pub h1h2_max_db: f32,
}

impl Default for ResonanceRanges {
    fn default() -> Self {
        Self {
            hf_lf_min: 0.20,
            hf_lf_max: 1.80,
            sc_min_hz: 600.0,
            sc_max_hz: 2400.0,
            vtl_min_cm: 14.0,
            vtl_max_cm: 22.0,
            delta_f_min_hz: 700.0,
            delta_f_max_hz: 1200.0,
            h1h2_min_db: 0.0,
            h1h2_max_db: 12.0,
        }
    }
}

/// Shape of an optional nonlinear reshape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReshapeKind {
    Sigmoid,
    InvSigmoid,
    Linear,
}

/// Logistic reshape; `mid` is given in the raw feature's units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReshapeSpec {
    #[serde(rename = "type")]
    pub kind: ReshapeKind,
    pub k: f32,
    pub mid: f32,
}

impl ReshapeSpec {
    fn apply(&self, v: f32, mid01: f32) -> f32 {
        match self.kind {
            ReshapeKind::Sigmoid => sigmoid(v, self.k, mid01),
            ReshapeKind::InvSigmoid => inv_sigmoid(v, self.k, mid01),
            ReshapeKind::Linear => v,
        }
    }
}

/// Per-component reshapes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NonlinearConfig {
    #[serde(default, rename = "hf_lf_left")]
    pub hf_lf: Option<ReshapeSpec>,
    #[serde(default, rename = "sc_left")]
    pub sc: Option<ReshapeSpec>,
    #[serde(default, rename = "h1h2_left")]
    pub h1h2: Option<ReshapeSpec>,
    #[serde(default, rename = "vtl_right")]
    pub vtl: Option<ReshapeSpec>,
    #[serde(default, rename = "dF_right")]
    pub delta_f: Option<ReshapeSpec>,
}

/// Cap on the composite for dark (low EHF/LF and low centroid) windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DarkGate {
    pub hf_lf_max: f32,
    pub sc_max_hz: f32,
    pub x_max: f32,
}

/// Resolved resonance-axis configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResonanceAxisConfig {
    /// Place the X axis from window brightness instead of frame resonance
    pub use_brightness_for_x: bool,
    pub weights: ResonanceWeights,
    pub ranges: ResonanceRanges,
    /// Normalise EHF/LF on a log10 scale
    pub hf_lf_log10: bool,
    pub nonlinear: NonlinearConfig,
    pub dark_gate: Option<DarkGate>,
    /// Expansion around 0.5 applied to the final X value
    pub gain: f32,
}

impl Default for ResonanceAxisConfig {
    fn default() -> Self {
        Self {
            use_brightness_for_x: false,
            weights: ResonanceWeights::default(),
            ranges: ResonanceRanges::default(),
            hf_lf_log10: false,
            nonlinear: NonlinearConfig::default(),
            dark_gate: None,
            gain: 1.0,
        }
    }
}

/// Normalised components before reshaping
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BrightnessComponents {
    pub hf_lf: f32,
    pub sc: f32,
    pub vtl_inv: f32,
    pub delta_f: f32,
    pub h1h2: f32,
}

/// Composite score plus its components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Brightness {
    pub composite: f32,
    pub components: BrightnessComponents,
}

impl ResonanceAxisConfig {
    fn normalize_hf_lf(&self, v: f32) -> f32 {
        let r = &self.ranges;
        if self.hf_lf_log10 {
            let log = |x: f32| x.max(LOG_EPSILON).log10();
            normalize(log(v), log(r.hf_lf_min), log(r.hf_lf_max))
        } else {
            normalize(v, r.hf_lf_min, r.hf_lf_max)
        }
    }

    fn normalize_vtl(&self, vtl_cm: f32) -> f32 {
        let r = &self.ranges;
        normalize(1.0 / vtl_cm, 1.0 / r.vtl_max_cm, 1.0 / r.vtl_min_cm)
    }
}

fn reshape(spec: Option<&ReshapeSpec>, v: f32, to01: impl Fn(f32) -> f32) -> f32 {
    match spec {
        Some(s) => s.apply(v, to01(s.mid)),
        None => v,
    }
}

/// Map window features onto the composite brightness score in [0, 1]
pub fn compute_brightness(cfg: &ResonanceAxisConfig, wf: &WindowFeatures) -> Brightness {
    let r = &cfg.ranges;
    let nl = &cfg.nonlinear;

    // +inf EHF/LF is saturated to the top of the range
    let ehf = if wf.ehf_over_elf.is_infinite() && wf.ehf_over_elf > 0.0 {
        r.hf_lf_max.max(r.hf_lf_min)
    } else {
        wf.ehf_over_elf
    };

    let components = BrightnessComponents {
        hf_lf: cfg.normalize_hf_lf(ehf),
        sc: normalize(wf.spectral_centroid, r.sc_min_hz, r.sc_max_hz),
        vtl_inv: cfg.normalize_vtl(wf.vtl_delta_f),
        delta_f: normalize(wf.delta_f, r.delta_f_min_hz, r.delta_f_max_hz),
        h1h2: normalize(wf.h1_minus_h2.max(0.0), r.h1h2_min_db, r.h1h2_max_db),
    };

    let hf_lf = reshape(nl.hf_lf.as_ref(), components.hf_lf, |m| cfg.normalize_hf_lf(m));
    let sc = reshape(nl.sc.as_ref(), components.sc, |m| normalize(m, r.sc_min_hz, r.sc_max_hz));
    let vtl_inv = reshape(nl.vtl.as_ref(), components.vtl_inv, |m| cfg.normalize_vtl(m));
    let delta_f = reshape(nl.delta_f.as_ref(), components.delta_f, |m| {
        normalize(m, r.delta_f_min_hz, r.delta_f_max_hz)
    });
    let h1h2 = reshape(nl.h1h2.as_ref(), components.h1h2, |m| {
        normalize(m, r.h1h2_min_db, r.h1h2_max_db)
    });

    let w = &cfg.weights;
    let mut composite = clamp01(
        w.hf_lf * hf_lf + w.sc * sc + w.vtl_inv * vtl_inv + w.delta_f * delta_f + w.h1h2 * h1h2,
    );

    if let Some(gate) = &cfg.dark_gate {
        if wf.ehf_over_elf <= gate.hf_lf_max && wf.spectral_centroid <= gate.sc_max_hz {
            composite = composite.min(gate.x_max);
        }
    }

    Brightness { composite, components }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::window::{RuleEvaluation, WindowDecision};

    fn features(ehf: f32, sc: f32, vtl: f32, delta_f: f32, h1h2: f32) -> WindowFeatures {
        WindowFeatures {
            f0_track: Vec::new(),
            f0_median: 0.0,
            f1: 500.0,
            f2: 1500.0,
            f3: 2500.0,
            delta_f,
            vtl_delta_f: vtl,
            vtl_formant_mean: vtl,
            h1_minus_h2: h1h2,
            ehf_over_elf: ehf,
            spectral_centroid: sc,
            prosody_range_st: 0.0,
            avg_pitch01: 0.5,
            avg_resonance01: 0.5,
            low_rules: RuleEvaluation::default(),
            high_rules: RuleEvaluation::default(),
            decision: WindowDecision::default(),
        }
    }

    #[test]
    fn test_dark_male_maps_left() {
        let cfg = ResonanceAxisConfig::default();
        let b = compute_brightness(&cfg, &features(0.01, 400.0, 22.0, 780.0, 20.0));
        assert!(b.composite < 0.2, "{:?}", b);
    }

    #[test]
    fn test_bright_female_maps_right() {
        let cfg = ResonanceAxisConfig::default();
        let b = compute_brightness(&cfg, &features(1.6, 2200.0, 14.0, 1100.0, 6.0));
        assert!(b.composite > 0.8, "{:?}", b);
    }

    #[test]
    fn test_infinite_ratio_saturates() {
        let cfg = ResonanceAxisConfig {
            hf_lf_log10: true,
            ..Default::default()
        };
        let b = compute_brightness(&cfg, &features(f32::INFINITY, 1000.0, 17.0, 900.0, 3.0));
        assert_eq!(b.components.hf_lf, 1.0);
        assert!((0.0..=1.0).contains(&b.composite));
    }

    #[test]
    fn test_composite_bounded_for_extreme_weights() {
        let cfg = ResonanceAxisConfig {
            weights: ResonanceWeights {
                hf_lf: 3.0,
                sc: -2.0,
                vtl_inv: 1.5,
                delta_f: 4.0,
                h1h2: -1.0,
            },
            ..Default::default()
        };
        for &ehf in &[0.0, 0.5, 5.0, f32::INFINITY] {
            for &sc in &[0.0, 1200.0, 9000.0] {
                for &vtl in &[8.0, 17.0, 30.0] {
                    let b = compute_brightness(&cfg, &features(ehf, sc, vtl, 1000.0, 4.0));
                    assert!((0.0..=1.0).contains(&b.composite));
                }
            }
        }
    }

    #[test]
    fn test_dark_gate_caps_composite() {
        let cfg = ResonanceAxisConfig {
            dark_gate: Some(DarkGate {
                hf_lf_max: 0.3,
                sc_max_hz: 900.0,
                x_max: 0.25,
            }),
            weights: ResonanceWeights {
                hf_lf: 0.0,
                sc: 0.0,
                vtl_inv: 0.5,
                delta_f: 0.5,
                h1h2: 0.0,
            },
            ..Default::default()
        };
        // Short tract and wide spacing pull hard right, the gate still caps
        let gated = compute_brightness(&cfg, &features(0.2, 800.0, 12.0, 1300.0, 0.0));
        assert!(gated.composite <= 0.25);

        let open = compute_brightness(&cfg, &features(0.5, 800.0, 12.0, 1300.0, 0.0));
        assert!(open.composite > 0.9);
    }

    #[test]
    fn test_monotonic_in_each_component() {
        let cfg = ResonanceAxisConfig::default();
        let base = compute_brightness(&cfg, &features(0.8, 1200.0, 17.0, 900.0, 4.0)).composite;
        let brighter = [
            features(1.2, 1200.0, 17.0, 900.0, 4.0),
            features(0.8, 1800.0, 17.0, 900.0, 4.0),
            features(0.8, 1200.0, 15.0, 900.0, 4.0),
            features(0.8, 1200.0, 17.0, 1100.0, 4.0),
            features(0.8, 1200.0, 17.0, 900.0, 8.0),
        ];
        for wf in &brighter {
            assert!(compute_brightness(&cfg, wf).composite >= base);
        }
    }

    #[test]
    fn test_reshape_midpoint_in_normalised_space() {
        let cfg = ResonanceAxisConfig {
            weights: ResonanceWeights {
                hf_lf: 0.0,
                sc: 1.0,
                vtl_inv: 0.0,
                delta_f: 0.0,
                h1h2: 0.0,
            },
            nonlinear: NonlinearConfig {
                sc: Some(ReshapeSpec {
                    kind: ReshapeKind::Sigmoid,
                    k: 10.0,
                    mid: 1500.0,
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let at_mid = compute_brightness(&cfg, &features(0.5, 1500.0, 17.0, 900.0, 0.0));
        assert!((at_mid.composite - 0.5).abs() < 1e-4);
        // Components report the pre-reshape value
        assert!((at_mid.components.sc - 0.5).abs() < 1e-4);

        let inverted = ResonanceAxisConfig {
            nonlinear: NonlinearConfig {
                sc: Some(ReshapeSpec {
                    kind: ReshapeKind::InvSigmoid,
                    k: 10.0,
                    mid: 1500.0,
                }),
                ..Default::default()
            },
            ..cfg
        };
        let high = compute_brightness(&inverted, &features(0.5, 2400.0, 17.0, 900.0, 0.0));
        assert!(high.composite < 0.05);
    }
}

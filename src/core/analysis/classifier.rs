// src/core/analysis/classifier.rs
//
// Zone classification of a (resonance, pitch) point and temporal hysteresis.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Proximity ratio above which a point counts as between both anchors
pub const ANDROGYNOUS_PROXIMITY_RATIO: f32 = 0.7;

const MIN_RADIUS: f32 = 1e-3;

/// Discrete voice category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Male,
    Androgynous,
    Female,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Male, Category::Androgynous, Category::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Male => "male",
            Category::Androgynous => "androgynous",
            Category::Female => "female",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference point with per-axis radii, all in normalised map space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub rx: f32,
    pub ry: f32,
}

impl Anchor {
    fn distance_sq(&self, x: f32, y: f32) -> f32 {
        let dx = (x - self.x) / self.rx.max(MIN_RADIUS);
        let dy = (y - self.y) / self.ry.max(MIN_RADIUS);
        dx * dx + dy * dy
    }
}

/// Classification policy, fixed when the configuration is resolved
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZonePolicy {
    /// Nearest of two anchors, androgynous when both are about equally near
    AnchorEllipse { male: Anchor, female: Anchor },
    /// Pitch-dependent boundary lines around `0.5 + bias`
    Diagonal {
        bias: f32,
        male_base: f32,
        male_slope: f32,
        andro_high_base: f32,
        andro_high_slope: f32,
    },
    /// Constant offsets around `0.5 + bias`
    Static {
        bias: f32,
        male_max: f32,
        female_min: f32,
    },
}

impl Default for ZonePolicy {
    fn default() -> Self {
        ZonePolicy::Static {
            bias: 0.0,
            male_max: -0.2,
            female_min: 0.08,
        }
    }
}

impl ZonePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ZonePolicy::AnchorEllipse { .. } => "anchor_ellipse",
            ZonePolicy::Diagonal { .. } => "diagonal",
            ZonePolicy::Static { .. } => "static",
        }
    }

    /// Move the zone centre to `0.5 + bias`; anchor policies have no centre
    pub fn set_bias(&mut self, new_bias: f32) {
        match self {
            ZonePolicy::Diagonal { bias, .. } | ZonePolicy::Static { bias, .. } => *bias = new_bias,
            ZonePolicy::AnchorEllipse { .. } => {}
        }
    }

    /// Classify a point; `x` is the resonance score, `y` the pitch score
    pub fn classify(&self, x: f32, y: f32) -> Category {
        match *self {
            ZonePolicy::AnchorEllipse { male, female } => {
                let d_male = male.distance_sq(x, y);
                let d_female = female.distance_sq(x, y);
                let ratio = if d_male > 0.0 && d_female > 0.0 {
                    d_male.min(d_female) / d_male.max(d_female)
                } else {
                    0.0
                };
                if ratio > ANDROGYNOUS_PROXIMITY_RATIO {
                    Category::Androgynous
                } else if d_male <= d_female {
                    Category::Male
                } else {
                    Category::Female
                }
            }
            ZonePolicy::Diagonal {
                bias,
                male_base,
                male_slope,
                andro_high_base,
                andro_high_slope,
            } => {
                let center = 0.5 + bias;
                let depth = 1.0 - y;
                zone_from_boundaries(
                    x,
                    center + male_base + male_slope * depth,
                    center + andro_high_base + andro_high_slope * depth,
                )
            }
            ZonePolicy::Static {
                bias,
                male_max,
                female_min,
            } => {
                let center = 0.5 + bias;
                zone_from_boundaries(x, center + male_max, center + female_min)
            }
        }
    }
}

fn zone_from_boundaries(x: f32, male_boundary: f32, high_boundary: f32) -> Category {
    if x <= male_boundary {
        Category::Male
    } else if x <= high_boundary {
        Category::Androgynous
    } else {
        Category::Female
    }
}

/// Classify with the given policy
pub fn classify(x: f32, y: f32, policy: &ZonePolicy) -> Category {
    policy.classify(x, y)
}

/// Plurality vote over the most recent raw labels
#[derive(Debug, Clone)]
pub struct Hysteresis {
    window: usize,
    recent: VecDeque<Category>,
}

impl Hysteresis {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            recent: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Record a raw label and return the stable one
    pub fn push(&mut self, label: Category) -> Category {
        self.recent.push_back(label);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
        self.stable().unwrap_or(label)
    }

    /// Mode of the buffer; ties go to the label seen most recently
    pub fn stable(&self) -> Option<Category> {
        let mut best: Option<(usize, usize, Category)> = None;
        for cat in Category::ALL {
            let count = self.recent.iter().filter(|&&c| c == cat).count();
            if count == 0 {
                continue;
            }
            let last_seen = self.recent.iter().rposition(|&c| c == cat).unwrap_or(0);
            let better = match best {
                None => true,
                Some((c, seen, _)) => count > c || (count == c && last_seen > seen),
            };
            if better {
                best = Some((count, last_seen, cat));
            }
        }
        best.map(|(_, _, cat)| cat)
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_policy_scenario() {
        let policy = ZonePolicy::Static {
            bias: 0.05,
            male_max: -0.2,
            female_min: 0.08,
        };
        assert_eq!(classify(0.95, 0.9, &policy), Category::Female);
        assert_eq!(classify(0.3, 0.9, &policy), Category::Male);
        assert_eq!(classify(0.5, 0.1, &policy), Category::Androgynous);
    }

    #[test]
    fn test_diagonal_boundaries_move_with_pitch() {
        let policy = ZonePolicy::Diagonal {
            bias: 0.0,
            male_base: -0.1,
            male_slope: 0.2,
            andro_high_base: 0.0,
            andro_high_slope: 0.2,
        };
        // High pitch: male boundary at 0.4
        assert_eq!(policy.classify(0.45, 1.0), Category::Androgynous);
        // Low pitch: male boundary moves to 0.6
        assert_eq!(policy.classify(0.45, 0.0), Category::Male);
        assert_eq!(policy.classify(0.75, 0.0), Category::Female);
    }

    #[test]
    fn test_anchor_ellipse_policy() {
        let policy = ZonePolicy::AnchorEllipse {
            male: Anchor {
                x: 0.2,
                y: 0.2,
                rx: 0.2,
                ry: 0.2,
            },
            female: Anchor {
                x: 0.8,
                y: 0.8,
                rx: 0.2,
                ry: 0.2,
            },
        };
        assert_eq!(policy.classify(0.25, 0.2), Category::Male);
        assert_eq!(policy.classify(0.75, 0.85), Category::Female);
        assert_eq!(policy.classify(0.5, 0.5), Category::Androgynous);
        // Exactly on an anchor: ratio is treated as 0
        assert_eq!(policy.classify(0.8, 0.8), Category::Female);
    }

    #[test]
    fn test_hysteresis_plurality() {
        let mut h = Hysteresis::new(3);
        let seq = [
            Category::Male,
            Category::Male,
            Category::Female,
            Category::Male,
            Category::Male,
        ];
        let mut stable = Category::Female;
        for c in seq {
            stable = h.push(c);
        }
        assert_eq!(stable, Category::Male);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_hysteresis_tie_prefers_latest() {
        let mut h = Hysteresis::new(4);
        h.push(Category::Male);
        h.push(Category::Female);
        h.push(Category::Male);
        assert_eq!(h.push(Category::Female), Category::Female);

        let mut h = Hysteresis::new(3);
        h.push(Category::Male);
        h.push(Category::Androgynous);
        assert_eq!(h.push(Category::Female), Category::Female);
    }

    #[test]
    fn test_hysteresis_reset() {
        let mut h = Hysteresis::new(0);
        assert_eq!(h.window(), 1);
        h.push(Category::Male);
        h.reset();
        assert!(h.is_empty());
        assert_eq!(h.stable(), None);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::Androgynous).unwrap();
        assert_eq!(json, "\"androgynous\"");
        assert_eq!(Category::Female.to_string(), "female");
    }
}

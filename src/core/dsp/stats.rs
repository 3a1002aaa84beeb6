//! Statistical helpers shared by the analysis stages

/// Median of a slice, `None` when empty
pub fn median(data: &[f32]) -> Option<f32> {
    if data.is_empty() {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean, `None` when empty
pub fn mean(data: &[f32]) -> Option<f32> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().map(|&v| v as f64).sum::<f64>() as f32 / data.len() as f32)
}

/// Population standard deviation, `None` when empty
pub fn std_dev(data: &[f32]) -> Option<f32> {
    let m = mean(data)?;
    let var = data.iter().map(|&v| (v - m) * (v - m)).sum::<f32>() / data.len() as f32;
    Some(var.sqrt())
}

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Clamp to [0, 1]; NaN maps to 0
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Linear map of `v` from `[min, max]` onto [0, 1], clamped.
///
/// Degenerate ranges (`min >= max`) and NaN inputs give 0.
pub fn normalize(v: f32, min: f32, max: f32) -> f32 {
    if !(max > min) || v.is_nan() {
        return 0.0;
    }
    clamp01((v - min) / (max - min))
}

/// Logistic curve `1 / (1 + e^(-k(v - t)))`
pub fn sigmoid(v: f32, k: f32, t: f32) -> f32 {
    clamp01(1.0 / (1.0 + (-k * (v - t)).exp()))
}

/// Mirrored logistic curve `1 - sigmoid(v, k, t)`
pub fn inv_sigmoid(v: f32, k: f32, t: f32) -> f32 {
    clamp01(1.0 - sigmoid(v, k, t))
}

/// Exponential moving average; the first sample initialises the state
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f32,
    value: Option<f32>,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    pub fn update(&mut self, x: f32) -> f32 {
        let next = match self.value {
            None => x,
            Some(y) => self.alpha * x + (1.0 - self.alpha) * y,
        };
        self.value = Some(next);
        next
    }

    /// Current smoothed value, `None` before the first update
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

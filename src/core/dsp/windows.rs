//! Window function implementations

use std::f32::consts::PI;

/// Symmetric Hann window, zero at both ends
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
        .collect()
}

/// Multiply `samples` by `window` into a new buffer.
///
/// The output length is the shorter of the two inputs.
pub fn apply_window(samples: &[f32], window: &[f32]) -> Vec<f32> {
    samples.iter().zip(window).map(|(s, w)| s * w).collect()
}

/// Hann window cached per frame length.
///
/// Capture loops deliver a constant frame size, so the coefficients are
/// only rebuilt when the length changes.
#[derive(Debug, Clone, Default)]
pub struct HannCache {
    coefficients: Vec<f32>,
}

impl HannCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window coefficients for `size` samples
    pub fn get(&mut self, size: usize) -> &[f32] {
        if self.coefficients.len() != size {
            self.coefficients = hann_window(size);
        }
        &self.coefficients
    }

    /// Taper `samples` with a window of matching length
    pub fn apply(&mut self, samples: &[f32]) -> Vec<f32> {
        let window = self.get(samples.len());
        apply_window(samples, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = hann_window(5);
        assert!(window[0].abs() < 1e-6);
        assert!(window[4].abs() < 1e-6);
        assert!((window[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hann_cache_regenerates_on_size_change() {
        let mut cache = HannCache::new();
        assert_eq!(cache.get(8).len(), 8);
        assert_eq!(cache.get(16).len(), 16);
        let tapered = cache.apply(&[1.0; 16]);
        assert_eq!(tapered.len(), 16);
        assert!(tapered[0].abs() < 1e-6);
    }
}

//! FFT processing with windowing

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::windows::hann_window;

/// Hann-windowed forward FFT of a fixed size
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_size: usize,
    buffer: Vec<Complex<f32>>,
}

impl FftProcessor {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            window: hann_window(fft_size),
            fft_size,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Squared magnitude of bins `0..fft_size/2`
    pub fn power_spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        self.buffer[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm_sqr())
            .collect()
    }

    /// Power spectral density averaged over 50%-overlapping sub-frames.
    ///
    /// Returns `None` when `samples` is shorter than one FFT frame.
    pub fn averaged_power_spectrum(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let hop = (self.fft_size / 2).max(1);
        let mut sum = vec![0.0f32; self.fft_size / 2];
        let mut frames = 0usize;
        let mut pos = 0usize;

        while pos + self.fft_size <= samples.len() {
            let power = self.power_spectrum(&samples[pos..pos + self.fft_size]);
            for (acc, p) in sum.iter_mut().zip(power) {
                *acc += p;
            }
            frames += 1;
            pos += hop;
        }

        if frames == 0 {
            return None;
        }
        let scale = 1.0 / frames as f32;
        sum.iter_mut().for_each(|p| *p *= scale);
        Some(sum)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Frequency spacing between bins for `sample_rate`
    pub fn hz_per_bin(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.fft_size as f32
    }
}

//! Digital Signal Processing utilities

mod fft;
mod stats;
mod windows;

pub use fft::FftProcessor;
pub use stats::{clamp01, inv_sigmoid, mean, median, normalize, rms, sigmoid, std_dev, Ema};
pub use windows::{apply_window, hann_window, HannCache};

//! vocalmap - Voice pitch and resonance mapping
//!
//! Places a voice on a two-dimensional map (resonance on X, pitch on Y) and
//! classifies it into female, androgynous or male zones.
//!
//! ## Features
//!
//! - **Pitch tracking**: Autocorrelation F0 detection with parabolic refinement
//! - **Formants**: LPC formant estimation with a smoothed resonance z-score
//! - **Window features**: 500 ms spectral windows with VTL, H1-H2, EHF/LF and centroid
//! - **Rule scoring**: Configurable low-F0 and high-F0 rule sets
//! - **Zone policies**: Anchor ellipses, diagonal boundaries or static lines
//! - **Live pipeline**: Noise-gated frame loop with hysteresis-stabilised categories
//! - **Offline reports**: Per-window zones and a percentage summary, as text or JSON
//!
//! ## Module Structure
//!
//! - `core` - DSP, analysis stages, live pipeline, offline analyzer
//! - `config` - JSON configuration loading and resolution
//! - `report` - Serialisable analysis results
//! - `cli` - Command-line interface
//! - `testgen` - Synthetic vowel and tone generation for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vocalmap::{AnalysisConfig, VoiceFileAnalyzer};
//!
//! let config = AnalysisConfig::from_path(Path::new("voice.json"))?;
//! let analyzer = VoiceFileAnalyzer::new(config);
//! let report = analyzer.analyze_file(Path::new("take1.wav"))?;
//!
//! println!("Final zone: {:?}", report.final_zone());
//! ```

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration loading
pub mod config;

// Report types
pub mod report;

// Test signal generation
pub mod testgen;

pub use config::{AnalysisConfig, ConfigBuilder, ConfigError};
pub use crate::core::analysis::{Category, PitchRange, WindowFeatures, ZonePolicy};
pub use crate::core::{
    AnalyzerBuilder, FrameResult, FrameStatus, PipelineEvent, VoiceFileAnalyzer, VoicePipeline,
};
pub use report::{AnalysisReport, StreamSummary, WindowReport, ZoneSummary};

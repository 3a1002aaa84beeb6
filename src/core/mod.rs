//! Core analysis: DSP primitives, per-frame estimators, the live pipeline
//! and the offline file analyzer

pub mod analysis;
pub mod analyzer;
pub mod decoder;
pub mod dsp;
pub mod pipeline;

pub use analyzer::{AnalyzerBuilder, VoiceFileAnalyzer};
pub use decoder::{decode_mono, DecodedAudio};
pub use pipeline::{FrameResult, FrameStatus, PipelineEvent, VoicePipeline};

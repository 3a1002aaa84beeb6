//! Configuration loading and resolution for vocalmap

mod settings;

pub use settings::{
    AnalysisConfig, ConfigBuilder, ConfigError, RawConfig, Setting, DEFAULT_GRADIENT_CLIP,
    DEFAULT_HYSTERESIS_WINDOWS,
};

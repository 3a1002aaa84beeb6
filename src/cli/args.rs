//! Command-line argument definitions

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use walkdir::WalkDir;

use crate::core::decoder::is_audio_file;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// How recordings are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Window-level zone analysis of the whole recording
    Offline,
    /// Frame-by-frame simulation of the live loop
    Live,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "vocalmap")]
#[command(version)]
#[command(about = "Map voice recordings onto a pitch/resonance plane and classify them into zones")]
pub struct Args {
    /// Input file or directory
    pub input: PathBuf,

    /// JSON configuration file
    #[arg(short, long, env = "VOCALMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Processing mode
    #[arg(short, long, value_enum, default_value_t = Mode::Offline)]
    pub mode: Mode,

    /// Print one row per analysed window
    #[arg(short, long)]
    pub windows: bool,

    /// Attach brightness composites to window reports
    #[arg(long)]
    pub brightness: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Collect every supported audio file under `path`.
///
/// A single file is accepted as-is when its extension is supported.
pub fn collect_audio_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if is_audio_file(path) {
            return Ok(vec![path.to_path_buf()]);
        }
        bail!("Unsupported audio file: {}", path.display());
    }
    if !path.is_dir() {
        bail!("Input not found: {}", path.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["vocalmap", "voice.wav"]).unwrap();
        assert_eq!(args.input, PathBuf::from("voice.wav"));
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.mode, Mode::Offline);
        assert!(!args.windows);
        assert!(!args.brightness);
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "vocalmap", "-f", "json", "--mode", "live", "-w", "--brightness", "-v", "dir",
        ])
        .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.mode, Mode::Live);
        assert!(args.windows && args.brightness && args.verbose);
    }

    #[test]
    fn test_missing_input_is_error() {
        assert!(collect_audio_files(Path::new("/nonexistent/vocalmap/input")).is_err());
    }
}

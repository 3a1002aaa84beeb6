// src/cli/mod.rs
//
// Command-line front end: file collection, batch analysis and printing.

mod args;
mod output;

pub use args::{collect_audio_files, Args, Mode, OutputFormat};
pub use output::{format_report, format_stream_summary, to_json};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{error, info};
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::core::decoder::decode_mono;
use crate::core::pipeline::{PipelineEvent, VoicePipeline, DEFAULT_FRAME_SIZE};
use crate::core::VoiceFileAnalyzer;
use crate::report::StreamSummary;

/// Load the configuration named on the command line, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let config = AnalysisConfig::from_path(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Feed a whole recording through the live pipeline frame by frame
pub fn stream_file(path: &Path, config: &AnalysisConfig) -> Result<StreamSummary> {
    let audio =
        decode_mono(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    let mut pipeline = VoicePipeline::new(audio.sample_rate, config);

    let mut results = Vec::new();
    let mut windows = 0usize;
    pipeline.process_samples(&audio.samples, DEFAULT_FRAME_SIZE, |event| match event {
        PipelineEvent::Frame(frame) => results.push(frame),
        PipelineEvent::Window(_) => windows += 1,
    });

    let frames = audio.samples.len() / DEFAULT_FRAME_SIZE;
    let mut summary = StreamSummary::from_results(audio.sample_rate, frames, &results, windows);
    summary.file = Some(path.display().to_string());
    Ok(summary)
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

/// Run `job` over every file, in parallel with a progress bar when there are several
fn run_batch<T, F>(
    files: &[PathBuf],
    show_progress: bool,
    job: F,
) -> Result<Vec<(PathBuf, Result<T>)>>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Sync,
{
    if files.len() == 1 {
        let file = files[0].clone();
        let result = job(file.as_path());
        return Ok(vec![(file, result)]);
    }

    let pb = if show_progress {
        progress_bar(files.len())?
    } else {
        ProgressBar::hidden()
    };
    let results = files
        .par_iter()
        .progress_with(pb.clone())
        .map(|file| (file.clone(), job(file.as_path())))
        .collect();
    pb.finish_and_clear();
    Ok(results)
}

/// Execute the command described by `args`
pub fn run(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let files = collect_audio_files(&args.input)?;

    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }
    info!("Found {} audio file(s)", files.len());

    let show_progress = args.format == OutputFormat::Text;
    match args.mode {
        Mode::Offline => {
            let analyzer = VoiceFileAnalyzer::builder()
                .config(config)
                .include_brightness(args.brightness)
                .build();
            let results = run_batch(&files, show_progress, |f| analyzer.analyze_file(f))?;
            print_results(args, results, |r| format_report(r, args.windows, args.verbose))
        }
        Mode::Live => {
            let results = run_batch(&files, show_progress, |f| stream_file(f, &config))?;
            print_results(args, results, format_stream_summary)
        }
    }
}

fn print_results<T, F>(
    args: &Args,
    results: Vec<(PathBuf, Result<T>)>,
    format_text: F,
) -> Result<()>
where
    T: serde::Serialize,
    F: Fn(&T) -> String,
{
    let mut ok = Vec::new();
    for (path, result) in results {
        match result {
            Ok(value) => ok.push(value),
            Err(e) => {
                error!("{}: {:#}", path.display(), e);
                if args.format == OutputFormat::Text {
                    println!("{} {}: {:#}\n", "✗".red(), path.display(), e);
                }
            }
        }
    }

    match args.format {
        OutputFormat::Json => {
            let json = if ok.len() == 1 && args.input.is_file() {
                to_json(&ok[0])?
            } else {
                to_json(&ok)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            for value in &ok {
                println!("{}", format_text(value));
            }
        }
    }
    Ok(())
}

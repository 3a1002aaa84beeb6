//! Output formatting for CLI results

use colorful::Colorful;

use crate::core::analysis::Category;
use crate::report::{AnalysisReport, StreamSummary, WindowReport};

fn paint(category: Category) -> String {
    let label = category.to_string();
    match category {
        Category::Female => label.magenta().to_string(),
        Category::Androgynous => label.yellow().to_string(),
        Category::Male => label.cyan().to_string(),
    }
}

fn paint_option(category: Option<Category>) -> String {
    match category {
        Some(c) => paint(c),
        None => "none".dim().to_string(),
    }
}

/// Format an offline report for terminal output
pub fn format_report(report: &AnalysisReport, show_windows: bool, verbose: bool) -> String {
    let mut out = String::new();

    if let Some(file) = &report.file {
        out.push_str(&format!("Analyzing: {}\n", file.clone().cyan()));
    }
    out.push_str(&format!(
        "  Sample Rate: {} Hz   Duration: {:.2}s\n",
        report.sample_rate, report.duration_secs
    ));
    out.push_str(&format!(
        "  Voiced: {}/{} frames ({:.0}%)   Windows: {}\n",
        report.voiced_frames,
        report.frames_analyzed,
        report.voiced_ratio() * 100.0,
        report.windows.len()
    ));
    if verbose {
        out.push_str(&format!(
            "  Policy: {}   Pitch range: {:.0}-{:.0} Hz\n",
            report.zone_policy,
            report.pitch_range.min_hz(),
            report.pitch_range.max_hz()
        ));
    }

    if report.windows.is_empty() {
        out.push_str(&format!("  {}\n", "No voiced windows".red()));
        return out;
    }

    out.push_str(&format!(
        "  Zones: {} {:.1}%  {} {:.1}%  {} {:.1}%\n",
        paint(Category::Female),
        report.summary.female_percent,
        paint(Category::Androgynous),
        report.summary.androgynous_percent,
        paint(Category::Male),
        report.summary.male_percent
    ));
    out.push_str(&format!("  Final zone: {}\n", paint_option(report.final_zone())));

    if show_windows {
        out.push_str(&format!(
            "\n  {}\n",
            format!(
                "{:>7} {:>7} {:>6} {:>6} {:>6} {:>5} {:>5} {:>5} {:>12} {:>12}",
                "t(s)", "F0", "SC", "VTL", "G", "x", "y", "S f/m", "zone", "stable"
            )
            .dim()
        ));
        for w in &report.windows {
            out.push_str(&format_window_row(w));
        }
    }

    out
}

fn format_window_row(w: &WindowReport) -> String {
    format!(
        "  {:>7.2} {:>7.1} {:>6.0} {:>6.1} {:>6.2} {:>5.2} {:>5.2} {:>2}/{:<2} {:>12} {:>12}\n",
        w.time_s,
        w.f0,
        w.sc,
        w.vtl,
        w.g,
        w.norm_score_x,
        w.norm_pitch_y,
        w.s_female,
        w.s_male,
        w.zone.to_string(),
        w.stable_zone.to_string()
    )
}

/// Format a live-mode summary for terminal output
pub fn format_stream_summary(summary: &StreamSummary) -> String {
    let mut out = String::new();

    if let Some(file) = &summary.file {
        out.push_str(&format!("Streaming: {}\n", file.clone().cyan()));
    }
    out.push_str(&format!(
        "  Frames: {}   Voiced: {}   Windows: {}\n",
        summary.frames, summary.voiced_frames, summary.windows
    ));

    if summary.voiced_frames == 0 {
        out.push_str(&format!("  {}\n", "No voiced frames".red()));
        return out;
    }

    let fmt = |v: Option<f32>, precision: usize| match v {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    };
    out.push_str(&format!(
        "  Mean F0: {} Hz   pitch: {}   x: {}\n",
        fmt(summary.mean_f0_hz, 1),
        fmt(summary.mean_pitch01, 2),
        fmt(summary.mean_x01, 2)
    ));
    out.push_str(&format!(
        "  Categories: {} {:.1}%  {} {:.1}%  {} {:.1}%\n",
        paint(Category::Female),
        summary.categories.female_percent,
        paint(Category::Androgynous),
        summary.categories.androgynous_percent,
        paint(Category::Male),
        summary.categories.male_percent
    ));
    out.push_str(&format!(
        "  Final category: {}\n",
        paint_option(summary.final_category)
    ));
    out
}

/// Serialise any report as pretty JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::PitchRange;
    use crate::report::ZoneSummary;

    fn empty_report() -> AnalysisReport {
        AnalysisReport {
            file: Some("voice.wav".to_string()),
            sample_rate: 44100,
            duration_secs: 1.0,
            frames_analyzed: 22,
            voiced_frames: 0,
            zone_policy: "static".to_string(),
            pitch_range: PitchRange::default(),
            windows: Vec::new(),
            summary: ZoneSummary::from_zones(Vec::new()),
        }
    }

    #[test]
    fn test_empty_report_text() {
        let text = format_report(&empty_report(), true, true);
        assert!(text.contains("voice.wav"));
        assert!(text.contains("No voiced windows"));
        assert!(text.contains("static"));
    }

    #[test]
    fn test_report_json_uses_frames_key() {
        let json = to_json(&empty_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["frames"].as_array().unwrap().is_empty());
        assert_eq!(value["summary"]["male_percent"], 0.0);
    }

    #[test]
    fn test_empty_stream_summary() {
        let summary = StreamSummary::from_results(16000, 10, &[], 0);
        let text = format_stream_summary(&summary);
        assert!(text.contains("No voiced frames"));
        assert_eq!(summary.final_category, None);
    }
}

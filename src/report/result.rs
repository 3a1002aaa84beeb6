// src/report/result.rs
//
// Serialisable results of an offline analysis.

use serde::Serialize;

use crate::core::analysis::{Category, PitchRange, WindowFeatures};
use crate::core::dsp::mean;
use crate::core::pipeline::FrameResult;

/// One analysed window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    pub time_s: f64,
    #[serde(rename = "F0")]
    pub f0: f32,
    #[serde(rename = "F1")]
    pub f1: f32,
    #[serde(rename = "F2")]
    pub f2: f32,
    #[serde(rename = "F3")]
    pub f3: f32,
    #[serde(rename = "VTL")]
    pub vtl: f32,
    #[serde(rename = "deltaF")]
    pub delta_f: f32,
    #[serde(rename = "H1_H2")]
    pub h1_h2: f32,
    /// Serialised as null when infinite
    #[serde(rename = "EHF_LF")]
    pub ehf_lf: f32,
    #[serde(rename = "SC")]
    pub sc: f32,
    #[serde(rename = "PR")]
    pub pr: f32,
    #[serde(rename = "S_female")]
    pub s_female: usize,
    #[serde(rename = "S_male")]
    pub s_male: usize,
    /// Rule gradient `S_female - S_male + bias`
    #[serde(rename = "G")]
    pub g: f32,
    pub norm_pitch_y: f32,
    pub norm_score_x: f32,
    pub zone: Category,
    pub stable_zone: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
}

impl WindowReport {
    /// Copy the acoustic measurements of a window; scores are filled by the caller
    pub fn from_features(time_s: f64, wf: &WindowFeatures) -> Self {
        Self {
            time_s,
            f0: wf.f0_median,
            f1: wf.f1,
            f2: wf.f2,
            f3: wf.f3,
            vtl: wf.vtl_delta_f,
            delta_f: wf.delta_f,
            h1_h2: wf.h1_minus_h2,
            ehf_lf: wf.ehf_over_elf,
            sc: wf.spectral_centroid,
            pr: wf.prosody_range_st,
            s_female: wf.decision.low_count,
            s_male: wf.decision.high_count,
            g: 0.0,
            norm_pitch_y: 0.0,
            norm_score_x: 0.0,
            zone: Category::Androgynous,
            stable_zone: Category::Androgynous,
            brightness: None,
        }
    }
}

/// Share of windows per zone, in percent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ZoneSummary {
    pub female_percent: f64,
    pub androgynous_percent: f64,
    pub male_percent: f64,
}

impl ZoneSummary {
    pub fn from_zones<I>(zones: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        let (mut female, mut andro, mut male, mut total) = (0usize, 0usize, 0usize, 0usize);
        for zone in zones {
            match zone {
                Category::Female => female += 1,
                Category::Androgynous => andro += 1,
                Category::Male => male += 1,
            }
            total += 1;
        }
        let total = total.max(1) as f64;
        Self {
            female_percent: 100.0 * female as f64 / total,
            androgynous_percent: 100.0 * andro as f64 / total,
            male_percent: 100.0 * male as f64 / total,
        }
    }

    pub fn percent(&self, category: Category) -> f64 {
        match category {
            Category::Female => self.female_percent,
            Category::Androgynous => self.androgynous_percent,
            Category::Male => self.male_percent,
        }
    }

    /// Zone with the largest share; `None` when nothing was classified
    pub fn dominant(&self) -> Option<Category> {
        let best = Category::ALL
            .into_iter()
            .max_by(|a, b| self.percent(*a).total_cmp(&self.percent(*b)))?;
        if self.percent(best) > 0.0 {
            Some(best)
        } else {
            None
        }
    }
}

/// Result of analysing one recording
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub frames_analyzed: usize,
    pub voiced_frames: usize,
    pub zone_policy: String,
    pub pitch_range: PitchRange,
    #[serde(rename = "frames")]
    pub windows: Vec<WindowReport>,
    pub summary: ZoneSummary,
}

impl AnalysisReport {
    /// Stable zone after the last window
    pub fn final_zone(&self) -> Option<Category> {
        self.windows.last().map(|w| w.stable_zone)
    }

    pub fn voiced_ratio(&self) -> f64 {
        if self.frames_analyzed == 0 {
            0.0
        } else {
            self.voiced_frames as f64 / self.frames_analyzed as f64
        }
    }
}

/// Result of streaming a recording through the live pipeline
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sample_rate: u32,
    pub frames: usize,
    pub voiced_frames: usize,
    pub windows: usize,
    pub mean_f0_hz: Option<f32>,
    pub mean_pitch01: Option<f32>,
    pub mean_x01: Option<f32>,
    /// Share of voiced frames per raw category
    pub categories: ZoneSummary,
    pub final_category: Option<Category>,
}

impl StreamSummary {
    pub fn from_results(
        sample_rate: u32,
        frames: usize,
        results: &[FrameResult],
        windows: usize,
    ) -> Self {
        let f0: Vec<f32> = results.iter().map(|r| r.f0_hz).collect();
        let pitch: Vec<f32> = results.iter().map(|r| r.pitch01).collect();
        let x: Vec<f32> = results.iter().map(|r| r.x01).collect();
        Self {
            file: None,
            sample_rate,
            frames,
            voiced_frames: results.len(),
            windows,
            mean_f0_hz: mean(&f0),
            mean_pitch01: mean(&pitch),
            mean_x01: mean(&x),
            categories: ZoneSummary::from_zones(results.iter().map(|r| r.category)),
            final_category: results.last().map(|r| r.stable_category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_summary_percentages() {
        let s = ZoneSummary::from_zones([
            Category::Male,
            Category::Male,
            Category::Female,
            Category::Androgynous,
        ]);
        assert_eq!(s.male_percent, 50.0);
        assert_eq!(s.female_percent, 25.0);
        assert_eq!(s.androgynous_percent, 25.0);
        assert_eq!(s.dominant(), Some(Category::Male));
    }

    #[test]
    fn test_empty_summary() {
        let s = ZoneSummary::from_zones(Vec::new());
        assert_eq!(s, ZoneSummary::default());
        assert_eq!(s.dominant(), None);
    }

    #[test]
    fn test_window_report_json_keys() {
        let report = WindowReport {
            ehf_lf: f32::INFINITY,
            ..WindowReport::from_features(0.25, &sample_features())
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("F0").is_some());
        assert!(json.get("S_female").is_some());
        assert!(json["EHF_LF"].is_null());
        assert_eq!(json["zone"], "androgynous");
        assert!(json.get("brightness").is_none());
    }

    fn sample_features() -> WindowFeatures {
        use crate::core::analysis::{RuleEvaluation, WindowDecision};
        WindowFeatures {
            f0_track: vec![180.0],
            f0_median: 180.0,
            f1: 500.0,
            f2: 1500.0,
            f3: 2500.0,
            delta_f: 1000.0,
            vtl_delta_f: 17.15,
            vtl_formant_mean: 17.15,
            h1_minus_h2: 3.0,
            ehf_over_elf: 0.8,
            spectral_centroid: 1400.0,
            prosody_range_st: 0.0,
            avg_pitch01: 0.55,
            avg_resonance01: 0.5,
            low_rules: RuleEvaluation::default(),
            high_rules: RuleEvaluation::default(),
            decision: WindowDecision::default(),
        }
    }
}

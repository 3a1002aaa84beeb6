// tests/config_test.rs
//
// Loading configuration documents from disk.

mod test_utils;

use test_utils::*;
use vocalmap::{AnalysisConfig, ConfigError, VoiceFileAnalyzer, ZonePolicy};
use vocalmap::testgen::VowelSpec;

fn with_sections(extra: &str) -> String {
    let trimmed = MINIMAL_CONFIG.trim_end().trim_end_matches('}');
    format!("{}, {}}}", trimmed, extra)
}

#[test]
fn test_load_minimal_config_from_file() {
    let dir = TempDir::new("vocalmap-config");
    let path = write_config(&dir, MINIMAL_CONFIG);
    let cfg = AnalysisConfig::from_path(&path).unwrap();
    assert_eq!(cfg, AnalysisConfig::default());
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new("vocalmap-config-missing");
    let err = AnalysisConfig::from_path(&dir.join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_anchor_config_drives_analysis() {
    let dir = TempDir::new("vocalmap-config-anchor");
    let path = write_config(
        &dir,
        &with_sections(
            r#""mapping": {
                "pitch_range": {"f0_min_hz": 80, "f0_max_hz": 300},
                "anchors": {"male": {"x": 0.2, "y": 0.2}, "female": {"x": 0.8, "y": 0.8}},
                "ellipse_radii": {"rx": 0.25, "ry": 0.25}
            }"#,
        ),
    );
    let cfg = AnalysisConfig::from_path(&path).unwrap();
    assert_eq!(cfg.zone_policy.name(), "anchor_ellipse");
    assert!(matches!(cfg.zone_policy, ZonePolicy::AnchorEllipse { .. }));
    assert_eq!(cfg.pitch_range().max_hz(), 300.0);

    let wav = write_vowel_wav(&dir, "voice.wav", &VowelSpec::male_a(), 2.0);
    let report = VoiceFileAnalyzer::new(cfg).analyze_file(&wav).unwrap();
    assert_eq!(report.zone_policy, "anchor_ellipse");
    assert_eq!(report.pitch_range.min_hz(), 80.0);
}

// tests/cli_test.rs
//
// Runs the vocalmap binary against generated recordings.

mod test_utils;

use std::fs;

use test_utils::*;
use vocalmap::testgen::VowelSpec;

#[test]
fn test_json_report_for_single_file() {
    let dir = TempDir::new("vocalmap-cli-json");
    let wav = write_vowel_wav(&dir, "voice.wav", &VowelSpec::female_i(), 2.0);

    let value = parse_json(&run_json_analysis(&wav));
    assert_eq!(value["sample_rate"], SAMPLE_RATE);
    assert_eq!(value["zone_policy"], "static");
    let frames = value["frames"].as_array().unwrap();
    assert!(!frames.is_empty());
    for frame in frames {
        assert!(frame["F0"].as_f64().unwrap() > 150.0);
        let zone = frame["zone"].as_str().unwrap();
        assert!(["female", "androgynous", "male"].contains(&zone));
    }
    let summary = &value["summary"];
    let total = summary["female_percent"].as_f64().unwrap()
        + summary["androgynous_percent"].as_f64().unwrap()
        + summary["male_percent"].as_f64().unwrap();
    assert!((total - 100.0).abs() < 1e-6);
}

#[test]
fn test_directory_produces_one_report_per_file() {
    let dir = TempDir::new("vocalmap-cli-dir");
    write_vowel_wav(&dir, "a.wav", &VowelSpec::male_a(), 1.0);
    write_vowel_wav(&dir, "b.wav", &VowelSpec::female_i(), 1.0);
    fs::write(dir.join("notes.txt"), "not audio").unwrap();

    let value = parse_json(&run_json_analysis(dir.path()));
    let reports = value.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    let mut files: Vec<&str> = reports.iter().map(|r| r["file"].as_str().unwrap()).collect();
    files.sort();
    assert!(files[0].ends_with("a.wav"));
    assert!(files[1].ends_with("b.wav"));
}

#[test]
fn test_live_mode_summary() {
    let dir = TempDir::new("vocalmap-cli-live");
    let wav = write_vowel_wav(&dir, "voice.wav", &VowelSpec::male_a(), 2.0);

    let output = run_vocalmap(&wav)
        .args(["--mode", "live", "--format", "json"])
        .output()
        .unwrap();
    let value = parse_json(&output);
    assert!(value["voiced_frames"].as_u64().unwrap() > 0);
    assert!(value["windows"].as_u64().unwrap() > 0);
    let f0 = value["mean_f0_hz"].as_f64().unwrap();
    assert!((f0 - 110.0).abs() < 10.0, "mean f0 {}", f0);
}

#[test]
fn test_text_output_with_config() {
    let dir = TempDir::new("vocalmap-cli-text");
    let wav = write_vowel_wav(&dir, "voice.wav", &VowelSpec::male_a(), 2.0);
    let config = write_config(&dir, MINIMAL_CONFIG);

    let output = run_vocalmap(&wav)
        .arg("--config")
        .arg(&config)
        .arg("--windows")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("voice.wav"));
    assert!(stdout.contains("Final zone"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new("vocalmap-cli-badconfig");
    let wav = write_vowel_wav(&dir, "voice.wav", &VowelSpec::male_a(), 1.0);
    let config = write_config(&dir, "{ broken");

    let output = run_vocalmap(&wav).arg("-c").arg(&config).output().unwrap();
    assert!(!output.status.success());
}

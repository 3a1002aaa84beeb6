#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use uuid::Uuid;
use vocalmap::testgen::{synth_vowel, write_wav, VowelSpec};

pub const SAMPLE_RATE: u32 = 22050;

/// Minimal configuration document carrying every required section
pub const MINIMAL_CONFIG: &str = r#"{
    "bands": {"split_hz": 1800, "sc_max_hz": 5000},
    "f0_zone": {"low_max_hz": 165, "high_min_hz": 180},
    "rules_female_lowF0": {
        "deltaF_min_hz": 1000, "vtl_max_cm": 16.5, "F2_min_hz": 1700,
        "H1_H2_min_db": 8, "EHF_LF_min": 1.1, "SC_min_hz": 1800,
        "prosody_min_semitones": 10, "CPP_max_db": 12, "HNR_max_db": 18,
        "need_true_at_least": 5
    },
    "rules_male_highF0": {
        "deltaF_max_hz": 850, "vtl_min_cm": 18, "F2_max_hz": 1500,
        "H1_H2_max_db": 5, "EHF_LF_max": 0.7, "SC_max_hz": 1500,
        "prosody_max_semitones": 8, "CPP_min_db": 12, "HNR_min_db": 20,
        "need_true_at_least": 5
    }
}"#;

/// Fresh scratch directory under the system temp dir
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()));
        fs::create_dir_all(&path).expect("Failed to create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Render a synthetic vowel to a 16-bit WAV
pub fn write_vowel_wav(dir: &TempDir, name: &str, spec: &VowelSpec, secs: f32) -> PathBuf {
    let path = dir.join(name);
    let len = (SAMPLE_RATE as f32 * secs) as usize;
    let samples = synth_vowel(spec, SAMPLE_RATE, len, 0.5);
    write_wav(&path, &samples, SAMPLE_RATE).expect("Failed to write WAV fixture");
    path
}

pub fn write_config(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, json).expect("Failed to write config");
    path
}

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vocalmap"))
}

pub fn run_vocalmap<P: AsRef<std::ffi::OsStr>>(input: P) -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.arg(input);
    cmd.env_remove("VOCALMAP_CONFIG");
    cmd
}

pub fn run_json_analysis<P: AsRef<std::ffi::OsStr>>(input: P) -> Output {
    run_vocalmap(input)
        .arg("--format")
        .arg("json")
        .output()
        .expect("Failed to execute with json format")
}

pub fn parse_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "vocalmap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

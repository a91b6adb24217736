// Run configuration for the batch analyzer.
//
// `AnalyzerConfig` holds every tunable of a run: where to read, where to
// write, the quantization grid, which file extensions count as MIDI, the
// percussion pitch-class sentinel, and what to do when a file fails to
// parse. Every field has a default, so a JSON config file only needs the
// fields it changes; CLI flags (main.rs) are applied on top.

use crate::classify::DEFAULT_PERCUSSION_PITCH_CLASS;
use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the batch driver does with a file that is not valid MIDI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailurePolicy {
    /// Log a warning and leave the file out of the output.
    #[default]
    Skip,
    /// Stop the run and return the error.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Directory scanned (non-recursively) for input files.
    pub input_dir: PathBuf,
    /// JSON file the analysis array is written to.
    pub output_file: PathBuf,
    /// Sub-beats per beat for quantized positions.
    pub resolution: u32,
    /// Extensions treated as MIDI, without the dot; matched case-insensitively.
    pub extensions: Vec<String>,
    /// Single notes with this pitch class are treated as percussion.
    /// `None` disables the sentinel.
    pub percussion_pitch_class: Option<u8>,
    pub on_parse_failure: ParseFailurePolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            input_dir: PathBuf::from("."),
            output_file: PathBuf::from("output.json"),
            resolution: 4,
            extensions: vec!["mid".to_string(), "midi".to_string()],
            percussion_pitch_class: Some(DEFAULT_PERCUSSION_PITCH_CLASS),
            on_parse_failure: ParseFailurePolicy::Skip,
        }
    }
}

impl AnalyzerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, AnalyzerError> {
        let data = std::fs::read_to_string(path).map_err(|e| AnalyzerError::io(path, e))?;
        let config: AnalyzerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.resolution == 0 {
            return Err(AnalyzerError::Config("resolution must be at least 1".into()));
        }
        if self.extensions.is_empty() {
            return Err(AnalyzerError::Config("extensions must not be empty".into()));
        }
        if let Some(pc) = self.percussion_pitch_class
            && pc > 11
        {
            return Err(AnalyzerError::Config(format!(
                "percussion_pitch_class {pc} is not a pitch class (0-11)"
            )));
        }
        Ok(())
    }

    /// True if `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

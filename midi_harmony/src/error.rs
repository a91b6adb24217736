// Error type shared by the score provider, the batch driver, and config loading.
//
// Only conditions that stop a file (or the whole run) are errors. Missing
// pitches, absent tempo marks, and chords without an explicit key are handled
// in place by the analysis (skip, `null`, statistical fallback) and never
// surface here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Reading an input file or writing the output file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not a usable Standard MIDI File.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyzerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalyzerError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AnalyzerError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that concern a single input file's contents, which the
    /// batch driver may skip past.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, AnalyzerError::Parse { .. })
    }
}

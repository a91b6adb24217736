// MIDI Harmony Analyzer
//
// Reads a directory of Standard MIDI Files and produces a time-aligned
// harmonic analysis per song: roman-numeral chord labels, key changes, time
// signature changes, a global key estimate, and the opening tempo. Every
// event is placed on a grid of quantized beat positions computed through the
// score's tempo map, and the per-part results are merged into one timeline.
//
// Architecture:
// - score.rs: Parsed score model (parts, measures, note/chord events, markers)
// - midi.rs: Standard MIDI File input via `midly`, builds a `Score`
// - tempo.rs: Piecewise-constant tempo map, quantizer, `BeatPosition` keys
// - classify.rs: Percussion detection for parts and single events
// - histogram.rs: Duration-weighted pitch-class histogram
// - key.rs: Keys, key naming, and the Krumhansl-Schmuckler key estimator
// - roman.rs: Chord identification and roman numeral figures
// - extract.rs: Per-part key change, time signature, and roman numeral maps
// - timeline.rs: Merging the maps into one sorted record per position
// - analysis.rs: Song-level fold over parts, global key, batch driver
// - config.rs: Run configuration (JSON file + defaults)
// - error.rs: Crate-wide error type
//
// Analysis of one score is deterministic: same file, same configuration, same
// JSON.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod histogram;
pub mod key;
pub mod midi;
pub mod roman;
pub mod score;
pub mod tempo;
pub mod timeline;

pub use analysis::{Analyzer, SongAnalysis};
pub use config::{AnalyzerConfig, ParseFailurePolicy};
pub use error::AnalyzerError;

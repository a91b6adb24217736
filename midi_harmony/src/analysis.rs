// Song-level analysis and the batch driver.
//
// One score is analyzed by folding its parts, in order, into a
// `PartAccumulator`. Percussion parts are passed over. For every other part
// the key changes and time signatures are merged in first (a later part
// overwrites an earlier one at the same position), then its roman numerals
// are extracted against the key changes accumulated so far. A chord in an
// early part therefore cannot see a key change that only a later part
// carries; the fold keeps that order dependence explicit and sequential.
//
// The global key is estimated separately, from one histogram over every
// non-percussion part, and is independent of the per-part fallback keys used
// for roman numerals.
//
// `Analyzer` wraps this for whole directories: it lists matching files in
// sorted order, parses each one (applying the configured parse-failure
// policy), and writes the array of `SongAnalysis` records as JSON.

use crate::classify::PartClassifier;
use crate::config::{AnalyzerConfig, ParseFailurePolicy};
use crate::error::AnalyzerError;
use crate::extract::{
    AnalysisContext, KeyChangeMap, RomanNumeralMap, TimeSignatureMap, extract_key_changes,
    extract_roman_numerals, extract_time_signatures,
};
use crate::histogram::PitchClassHistogram;
use crate::key::{Key, KeyEstimator, KrumhanslSchmuckler};
use crate::midi;
use crate::score::{Part, Score};
use crate::tempo::{Quantizer, TempoMap};
use crate::timeline::{ScoreAnalysis, merge_timeline};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One output record per input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongAnalysis {
    pub song_name: String,
    /// Global key estimate, e.g. "Cmajor".
    pub key: String,
    /// BPM of the first tempo mark; `null` when the score has none.
    pub tempo: Option<f64>,
    pub score_analysis: ScoreAnalysis,
}

/// Maps built up across the parts of one score.
#[derive(Debug, Clone, Default)]
pub struct PartAccumulator {
    pub key_changes: KeyChangeMap,
    pub time_signatures: TimeSignatureMap,
    pub roman_numerals: RomanNumeralMap,
}

/// Fold one part into the accumulated maps.
pub fn accumulate_part(
    mut acc: PartAccumulator,
    part: &Part,
    ctx: &AnalysisContext,
) -> PartAccumulator {
    if ctx.classifier.is_percussion_part(part) {
        log::debug!("part '{}': percussion, skipped", part.id);
        return acc;
    }

    let key_changes = extract_key_changes(part, ctx);
    let time_signatures = extract_time_signatures(part, ctx);
    log::debug!(
        "part '{}': {} key change(s), {} time signature(s)",
        part.id,
        key_changes.len(),
        time_signatures.len()
    );
    acc.key_changes.extend(key_changes);
    acc.time_signatures.extend(time_signatures);

    let numerals = extract_roman_numerals(part, &acc.key_changes, ctx);
    log::debug!("part '{}': {} roman numeral(s)", part.id, numerals.len());
    acc.roman_numerals.extend(numerals);
    acc
}

/// Key of the whole score with percussion left out.
pub fn estimate_global_key(score: &Score, ctx: &AnalysisContext) -> Key {
    let events = score
        .parts
        .iter()
        .filter(|part| !ctx.classifier.is_percussion_part(part))
        .flat_map(|part| part.events());
    let histogram = PitchClassHistogram::from_events(events, ctx.classifier);
    if histogram.is_empty() {
        log::debug!("no pitched weight for global key estimate");
    }
    ctx.estimator.estimate(&histogram).key
}

/// Analyze one parsed score.
pub fn analyze_score(song_name: &str, score: &Score, ctx: &AnalysisContext) -> SongAnalysis {
    let acc = score
        .parts
        .iter()
        .fold(PartAccumulator::default(), |acc, part| accumulate_part(acc, part, ctx));

    SongAnalysis {
        song_name: song_name.to_string(),
        key: estimate_global_key(score, ctx).name(),
        tempo: score.first_tempo(),
        score_analysis: merge_timeline(&acc.key_changes, &acc.time_signatures, &acc.roman_numerals),
    }
}

/// Batch driver over a directory of MIDI files.
pub struct Analyzer {
    config: AnalyzerConfig,
    classifier: PartClassifier,
    estimator: Box<dyn KeyEstimator>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        config.validate()?;
        Ok(Analyzer {
            classifier: PartClassifier::new(config.percussion_pitch_class),
            estimator: Box::new(KrumhanslSchmuckler::default()),
            config,
        })
    }

    /// Swap in a different key-finding algorithm.
    pub fn with_estimator(mut self, estimator: Box<dyn KeyEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn analyze_score(&self, song_name: &str, score: &Score) -> SongAnalysis {
        let tempo_map = TempoMap::new(&score.tempo_marks);
        let ctx = AnalysisContext {
            tempo_map: &tempo_map,
            quantizer: Quantizer::new(self.config.resolution),
            classifier: &self.classifier,
            estimator: self.estimator.as_ref(),
        };
        analyze_score(song_name, score, &ctx)
    }

    /// Parse and analyze one file. The song name is the file stem.
    pub fn analyze_file(&self, path: &Path) -> Result<SongAnalysis, AnalyzerError> {
        let score = midi::load_score(path)?;
        let song_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.analyze_score(&song_name, &score))
    }

    /// Matching files in the input directory, sorted by path.
    pub fn input_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        let dir = &self.config.input_dir;
        let entries = std::fs::read_dir(dir).map_err(|e| AnalyzerError::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| AnalyzerError::io(dir, e))?.path();
            if path.is_file() && self.config.matches_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Analyze every matching file. Unparseable files are skipped or abort
    /// the run according to `on_parse_failure`; I/O errors always abort.
    pub fn analyze_directory(&self) -> Result<Vec<SongAnalysis>, AnalyzerError> {
        let files = self.input_files()?;
        log::info!("found {} MIDI file(s) in {}", files.len(), self.config.input_dir.display());

        let mut songs = Vec::with_capacity(files.len());
        for path in &files {
            log::info!("analyzing {}", path.display());
            match self.analyze_file(path) {
                Ok(song) => songs.push(song),
                Err(e)
                    if e.is_parse_failure()
                        && self.config.on_parse_failure == ParseFailurePolicy::Skip =>
                {
                    log::warn!("skipping: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(songs)
    }

    /// Analyze the input directory and write the JSON array to the output
    /// file. Returns the number of songs written.
    pub fn run(&self) -> Result<usize, AnalyzerError> {
        let songs = self.analyze_directory()?;
        let mut json = serde_json::to_string_pretty(&songs)?;
        json.push('\n');
        let out = &self.config.output_file;
        std::fs::write(out, json).map_err(|e| AnalyzerError::io(out, e))?;
        log::info!("wrote {} song(s) to {}", songs.len(), out.display());
        Ok(songs.len())
    }
}

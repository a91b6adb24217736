// Per-part extraction of key changes, time signatures, and roman numerals.
//
// All three extractors take one non-percussion part and return a map keyed by
// quantized beat position. Positions come from the shared `AnalysisContext`
// (tempo map + quantizer), so every map of one score lives on the same grid.
//
// Key and time-signature extraction walk the part's explicit markers in
// offset order and drop a marker only when it repeats the last *emitted*
// value. Two different markers that quantize to the same position collide and
// the later one wins, as with any map insert.
//
// Roman numerals need a governing key per chord: the known key change whose
// raw offset is the latest one at or before the chord's raw offset. The caller
// passes the key changes accumulated so far (earlier parts plus this one), so
// results depend on part order; see analysis.rs. When no key change applies,
// the part's own histogram is run through the estimator, at most once per
// part, and the entry is tagged `KeySource::Estimated`.

use crate::classify::PartClassifier;
use crate::histogram::PitchClassHistogram;
use crate::key::{Key, KeyEstimator};
use crate::roman;
use crate::score::Part;
use crate::tempo::{BeatPosition, Quantizer, TempoMap};
use std::collections::BTreeMap;

/// Shared, read-only inputs for analyzing the parts of one score.
pub struct AnalysisContext<'a> {
    pub tempo_map: &'a TempoMap,
    pub quantizer: Quantizer,
    pub classifier: &'a PartClassifier,
    pub estimator: &'a dyn KeyEstimator,
}

impl AnalysisContext<'_> {
    /// Quantized beat position of a raw score offset.
    pub fn position(&self, offset: f64) -> BeatPosition {
        self.quantizer.round_offset(offset, self.tempo_map)
    }
}

/// An emitted key change. The raw offset is kept for governing-key lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChange {
    pub offset: f64,
    pub key: Key,
}

pub type KeyChangeMap = BTreeMap<BeatPosition, KeyChange>;

/// Position -> "numerator/denominator".
pub type TimeSignatureMap = BTreeMap<BeatPosition, String>;

pub type RomanNumeralMap = BTreeMap<BeatPosition, RomanNumeralEntry>;

/// Where a roman numeral's key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// An explicit key signature governs the chord.
    Explicit,
    /// No key signature applied; the part-level estimate was used.
    Estimated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RomanNumeralEntry {
    /// Raw offset of the chord.
    pub offset: f64,
    pub key: Key,
    pub figure: String,
    pub key_source: KeySource,
}

/// Key changes of one part, consecutive repeats removed.
pub fn extract_key_changes(part: &Part, ctx: &AnalysisContext) -> KeyChangeMap {
    let mut changes = KeyChangeMap::new();
    let mut previous: Option<String> = None;
    for marker in &part.key_signatures {
        let name = marker.key.name();
        if previous.as_deref() == Some(name.as_str()) {
            continue;
        }
        changes.insert(
            ctx.position(marker.offset),
            KeyChange {
                offset: marker.offset,
                key: marker.key.clone(),
            },
        );
        previous = Some(name);
    }
    changes
}

/// Time-signature changes of one part, consecutive repeats removed.
pub fn extract_time_signatures(part: &Part, ctx: &AnalysisContext) -> TimeSignatureMap {
    let mut changes = TimeSignatureMap::new();
    let mut previous: Option<String> = None;
    for signature in &part.time_signatures {
        let label = signature.label();
        if previous.as_ref() == Some(&label) {
            continue;
        }
        changes.insert(ctx.position(signature.offset), label.clone());
        previous = Some(label);
    }
    changes
}

/// The key change in force at `offset`: the latest one at or before it.
pub fn governing_key(key_changes: &KeyChangeMap, offset: f64) -> Option<&KeyChange> {
    key_changes
        .values()
        .filter(|change| change.offset <= offset)
        .max_by(|a, b| a.offset.total_cmp(&b.offset))
}

/// Statistical key of a part on its own.
pub fn estimate_part_key(part: &Part, ctx: &AnalysisContext) -> Key {
    let histogram = PitchClassHistogram::from_events(part.events(), ctx.classifier);
    if histogram.is_empty() {
        log::debug!("part '{}': no pitched weight for key estimate", part.id);
    }
    ctx.estimator.estimate(&histogram).key
}

/// Roman numerals for every chord of a part.
pub fn extract_roman_numerals(
    part: &Part,
    key_changes: &KeyChangeMap,
    ctx: &AnalysisContext,
) -> RomanNumeralMap {
    let mut numerals = RomanNumeralMap::new();
    let mut part_key: Option<Key> = None;

    for measure in &part.measures {
        for event in &measure.events {
            if !event.is_chord() || ctx.classifier.is_percussion_element(event) {
                continue;
            }
            let Some(pitches) = event.pitches() else {
                continue;
            };

            let (key, key_source) = match governing_key(key_changes, event.offset) {
                Some(change) => (change.key.clone(), KeySource::Explicit),
                None => {
                    if part_key.is_none() {
                        log::debug!("part '{}': no explicit key, estimating from part", part.id);
                    }
                    let key = part_key
                        .get_or_insert_with(|| estimate_part_key(part, ctx))
                        .clone();
                    (key, KeySource::Estimated)
                }
            };

            let Some(figure) = roman::roman_numeral(pitches, &key) else {
                continue;
            };
            numerals.insert(
                ctx.position(event.offset),
                RomanNumeralEntry {
                    offset: event.offset,
                    key,
                    figure,
                    key_source,
                },
            );
        }
    }

    numerals
}

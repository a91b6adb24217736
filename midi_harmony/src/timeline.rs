// Merging the per-score event maps into one timeline.
//
// The roman-numeral map is the base: each entry becomes a record carrying
// its figure and governing key. Key changes and time-signature changes are
// then upserted field by field, creating a record where no chord sits. The
// result is keyed by quantized position, so every position from any input
// appears exactly once and iteration is ascending.

use crate::extract::{KeyChangeMap, RomanNumeralMap, TimeSignatureMap};
use crate::tempo::BeatPosition;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything known at one quantized position. Absent fields are omitted
/// from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisRecord {
    /// Governing key of the roman numeral.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roman_numeral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_change: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
}

pub type ScoreAnalysis = BTreeMap<BeatPosition, AnalysisRecord>;

/// Union the three maps into one record per position.
pub fn merge_timeline(
    key_changes: &KeyChangeMap,
    time_signatures: &TimeSignatureMap,
    roman_numerals: &RomanNumeralMap,
) -> ScoreAnalysis {
    let mut timeline: ScoreAnalysis = roman_numerals
        .iter()
        .map(|(&position, entry)| {
            let record = AnalysisRecord {
                key: Some(entry.key.name()),
                roman_numeral: Some(entry.figure.clone()),
                ..Default::default()
            };
            (position, record)
        })
        .collect();

    for (&position, change) in key_changes {
        timeline.entry(position).or_default().key_change = Some(change.key.name());
    }
    for (&position, signature) in time_signatures {
        timeline.entry(position).or_default().time_signature = Some(signature.clone());
    }

    timeline
}

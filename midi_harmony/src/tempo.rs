// Tempo-aware time quantization.
//
// Every analysis result is keyed by a quantized beat position: an absolute
// score offset pushed through the piecewise-constant tempo map to get elapsed
// beats, then rounded to a fixed number of sub-beats per beat.
//
// TempoMap: regimes are walked in offset order. Each closed regime adds
// `(regime_end - regime_start) * bpm / 60`; the open regime containing the
// query adds `(query - last_change) * bpm / 60`. Time before the first tempo
// mark runs at 120 BPM. A tempo change exactly at the query offset closes the
// previous regime at the query, so its own BPM covers zero time.
//
// BeatPosition stores the rounded value as an integer count of sub-beats so
// positions can be map keys with exact equality. Rounding is
// round-half-to-even (`f64::round_ties_even`); this decides whether events
// sitting exactly between two sub-beats collide.

use crate::score::TempoMark;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Tempo assumed before the first explicit tempo mark.
pub const DEFAULT_BPM: f64 = 120.0;

/// Piecewise-constant tempo timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TempoMap {
    /// (offset, bpm) change points, non-decreasing in offset.
    changes: Vec<TempoMark>,
}

impl TempoMap {
    /// Build from tempo marks in any order. Marks sharing an offset keep their
    /// input order, so the later one governs what follows.
    pub fn new(marks: &[TempoMark]) -> Self {
        let mut changes = marks.to_vec();
        changes.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        TempoMap { changes }
    }

    /// Elapsed beats from the start of the score to `offset`.
    pub fn elapsed_beats(&self, offset: f64) -> f64 {
        let mut elapsed = 0.0;
        let mut previous_offset = 0.0;
        let mut previous_bpm = DEFAULT_BPM;
        for change in &self.changes {
            if change.offset > offset {
                break;
            }
            elapsed += (change.offset - previous_offset) * (previous_bpm / 60.0);
            previous_offset = change.offset;
            previous_bpm = change.bpm;
        }
        elapsed + (offset - previous_offset) * (previous_bpm / 60.0)
    }
}

/// A quantized beat position: `steps / resolution` beats from score start.
///
/// Ordering and equality compare the beat value exactly, so positions with
/// different resolutions still compare correctly.
#[derive(Debug, Clone, Copy)]
pub struct BeatPosition {
    steps: u64,
    resolution: u32,
}

impl BeatPosition {
    pub fn new(steps: u64, resolution: u32) -> Self {
        BeatPosition { steps, resolution }
    }

    /// Position in beats.
    pub fn beats(&self) -> f64 {
        self.steps as f64 / self.resolution as f64
    }
}

impl PartialEq for BeatPosition {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BeatPosition {}

impl PartialOrd for BeatPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeatPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiply to compare the fractions without rounding.
        let lhs = self.steps as u128 * other.resolution as u128;
        let rhs = other.steps as u128 * self.resolution as u128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for BeatPosition {
    /// Float form with at least one decimal: "4.0", "4.25".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.beats())
    }
}

impl Serialize for BeatPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Rounds offsets or beat counts to a fixed sub-beat grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    /// Sub-beats per beat; 4 is a sixteenth-note grid when the beat is a
    /// quarter note. Always at least 1.
    resolution: u32,
}

impl Quantizer {
    pub fn new(resolution: u32) -> Self {
        Quantizer {
            resolution: resolution.max(1),
        }
    }

    /// Round a beat count to the grid. Negative input clamps to zero.
    pub fn round_beats(&self, beats: f64) -> BeatPosition {
        let steps = (beats * self.resolution as f64).round_ties_even();
        // `as` saturates: NaN and negatives become 0.
        BeatPosition::new(steps as u64, self.resolution)
    }

    /// Quantized beat position of a score offset under `tempo_map`.
    pub fn round_offset(&self, offset: f64, tempo_map: &TempoMap) -> BeatPosition {
        self.round_beats(tempo_map.elapsed_beats(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(offset: f64, bpm: f64) -> TempoMark {
        TempoMark { offset, bpm }
    }

    #[test]
    fn test_single_regime() {
        let map = TempoMap::new(&[mark(0.0, 120.0)]);
        assert_eq!(map.elapsed_beats(2.0), 4.0);
        let q = Quantizer::new(4);
        assert_eq!(q.round_offset(2.0, &map).beats(), 4.0);
    }

    #[test]
    fn test_tempo_change() {
        let map = TempoMap::new(&[mark(0.0, 120.0), mark(4.0, 60.0)]);
        // 4 * (120/60) + 2 * (60/60)
        assert_eq!(map.elapsed_beats(6.0), 10.0);
    }

    #[test]
    fn test_empty_map_is_constant_120() {
        let map = TempoMap::default();
        assert_eq!(map.elapsed_beats(0.0), 0.0);
        assert_eq!(map.elapsed_beats(3.0), 6.0);
    }

    #[test]
    fn test_default_tempo_before_first_mark() {
        let map = TempoMap::new(&[mark(2.0, 60.0)]);
        // 2 units at 120, then 1 at 60.
        assert_eq!(map.elapsed_beats(3.0), 5.0);
    }

    #[test]
    fn test_query_on_change_point_uses_previous_bpm() {
        let map = TempoMap::new(&[mark(0.0, 120.0), mark(4.0, 30.0)]);
        assert_eq!(map.elapsed_beats(4.0), 8.0);
        assert_eq!(map.elapsed_beats(5.0), 8.5);
    }

    #[test]
    fn test_unsorted_marks_are_ordered() {
        let map = TempoMap::new(&[mark(4.0, 60.0), mark(0.0, 120.0)]);
        assert_eq!(map.elapsed_beats(6.0), 10.0);
    }

    #[test]
    fn test_elapsed_beats_monotonic() {
        let maps = [
            TempoMap::default(),
            TempoMap::new(&[mark(0.0, 90.0)]),
            TempoMap::new(&[mark(0.0, 200.0), mark(1.5, 40.0), mark(1.5, 75.0), mark(7.0, 300.0)]),
            TempoMap::new(&[mark(3.0, 10.0), mark(3.25, 180.0)]),
        ];
        for map in &maps {
            let mut previous = map.elapsed_beats(0.0);
            for i in 1..=400 {
                let beats = map.elapsed_beats(i as f64 * 0.03125);
                assert!(beats >= previous, "{map:?} decreased at step {i}");
                previous = beats;
            }
        }
    }

    #[test]
    fn test_round_half_to_even() {
        let q = Quantizer::new(1);
        assert_eq!(q.round_beats(0.5).beats(), 0.0);
        assert_eq!(q.round_beats(1.5).beats(), 2.0);
        assert_eq!(q.round_beats(2.5).beats(), 2.0);
        assert_eq!(q.round_beats(2.6).beats(), 3.0);
        assert_eq!(q.round_beats(-1.0).beats(), 0.0);

        let quarter = Quantizer::new(4);
        assert_eq!(quarter.round_beats(0.125), BeatPosition::new(0, 4));
        assert_eq!(quarter.round_beats(0.375), BeatPosition::new(2, 4));
    }

    #[test]
    fn test_round_beats_idempotent() {
        let q = Quantizer::new(4);
        for raw in [0.0, 0.1, 0.37, 1.125, 2.874, 10.0 / 3.0, 99.99] {
            let once = q.round_beats(raw);
            let twice = q.round_beats(once.beats());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_beat_position_ordering_and_display() {
        let a = BeatPosition::new(2, 4);
        let b = BeatPosition::new(1, 2);
        assert_eq!(a, b);
        assert!(BeatPosition::new(3, 4) > b);
        assert_eq!(BeatPosition::new(16, 4).to_string(), "4.0");
        assert_eq!(BeatPosition::new(17, 4).to_string(), "4.25");
        assert_eq!(BeatPosition::new(0, 8).to_string(), "0.0");
    }

    #[test]
    fn test_zero_resolution_clamps_to_one() {
        let q = Quantizer::new(0);
        assert_eq!(q.round_beats(2.4), BeatPosition::new(2, 1));
        assert_eq!(q.round_beats(2.4).to_string(), "2.0");
    }
}

// Duration-weighted pitch-class histogram.
//
// Each non-percussion event adds its duration (in quarter lengths) to the bin
// of every pitch class it contains. A chord adds its full duration to each of
// its pitch classes rather than splitting it. Events with no resolvable pitch
// are skipped. Accumulation is plain addition, so event order does not affect
// the sums.

use crate::classify::PartClassifier;
use crate::score::Event;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchClassHistogram {
    bins: [f64; 12],
}

impl PitchClassHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a stream of events, skipping percussion.
    pub fn from_events<'a, I>(events: I, classifier: &PartClassifier) -> Self
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut histogram = Self::new();
        for event in events {
            histogram.add_event(event, classifier);
        }
        histogram
    }

    /// Add one event. Returns false if it contributed nothing (percussion or
    /// pitchless).
    pub fn add_event(&mut self, event: &Event, classifier: &PartClassifier) -> bool {
        if classifier.is_percussion_element(event) {
            return false;
        }
        let Some(pitches) = event.pitches() else {
            return false;
        };
        for &pitch in pitches {
            self.add(pitch % 12, event.duration);
        }
        true
    }

    /// Add `weight` to one pitch class bin.
    pub fn add(&mut self, pitch_class: u8, weight: f64) {
        self.bins[(pitch_class % 12) as usize] += weight;
    }

    pub fn bins(&self) -> &[f64; 12] {
        &self.bins
    }

    /// True when no pitched event has contributed any weight.
    pub fn is_empty(&self) -> bool {
        self.bins.iter().all(|&w| w == 0.0)
    }
}

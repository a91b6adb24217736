// Percussion classification for parts and events.
//
// Percussion never feeds harmonic analysis. A part is percussion when any
// instrument assigned in it is (General MIDI channel 10). An individual event
// is percussion when it is unpitched or a percussion chord, or when it is a
// single pitched note whose pitch class equals the sentinel.
//
// The sentinel is a convention of the MIDI exports this tool was written
// for: drum hits routed to a melodic channel land on pitch class 10. It is
// configurable and can be turned off (`None`). When enabled it also drops
// genuine single B-flat notes from the histogram.

use crate::score::{Event, EventKind, Part};

/// Pitch class that marks percussion-mapped notes in the reference exports.
pub const DEFAULT_PERCUSSION_PITCH_CLASS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartClassifier {
    /// Single notes with this pitch class count as percussion.
    pub percussion_pitch_class: Option<u8>,
}

impl Default for PartClassifier {
    fn default() -> Self {
        PartClassifier {
            percussion_pitch_class: Some(DEFAULT_PERCUSSION_PITCH_CLASS),
        }
    }
}

impl PartClassifier {
    pub fn new(percussion_pitch_class: Option<u8>) -> Self {
        PartClassifier {
            percussion_pitch_class,
        }
    }

    /// True if any instrument in the part is a percussion instrument.
    pub fn is_percussion_part(&self, part: &Part) -> bool {
        part.instruments.iter().any(|i| i.is_percussion())
    }

    /// True if the event must be kept out of harmonic analysis.
    pub fn is_percussion_element(&self, event: &Event) -> bool {
        match &event.kind {
            EventKind::Unpitched { .. } | EventKind::PercussionChord { .. } => true,
            EventKind::Note { pitch } => self.percussion_pitch_class == Some(pitch % 12),
            EventKind::Chord { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Instrument;

    fn event(kind: EventKind) -> Event {
        Event {
            offset: 0.0,
            duration: 1.0,
            kind,
        }
    }

    #[test]
    fn test_percussion_part() {
        let classifier = PartClassifier::default();
        let mut part = Part {
            instruments: vec![Instrument { channel: 0 }],
            ..Default::default()
        };
        assert!(!classifier.is_percussion_part(&part));

        part.instruments.push(Instrument { channel: 9 });
        assert!(classifier.is_percussion_part(&part));
    }

    #[test]
    fn test_percussion_elements() {
        let classifier = PartClassifier::default();
        assert!(classifier.is_percussion_element(&event(EventKind::Unpitched { key: 38 })));
        assert!(classifier.is_percussion_element(&event(EventKind::PercussionChord {
            keys: vec![36, 42],
        })));
        // Bb4 = 70, pitch class 10.
        assert!(classifier.is_percussion_element(&event(EventKind::Note { pitch: 70 })));
        assert!(!classifier.is_percussion_element(&event(EventKind::Note { pitch: 69 })));
        // Chords are never filtered by the sentinel.
        assert!(!classifier.is_percussion_element(&event(EventKind::Chord {
            pitches: vec![58, 62, 65],
        })));
    }

    #[test]
    fn test_sentinel_disabled() {
        let classifier = PartClassifier::new(None);
        assert!(!classifier.is_percussion_element(&event(EventKind::Note { pitch: 70 })));
        assert!(classifier.is_percussion_element(&event(EventKind::Unpitched { key: 70 })));
    }
}

// The parsed score: the read-only input to every analysis stage.
//
// A Score owns its parts and its tempo marks. Each part is a sequence of
// measures holding note/chord events, plus the key-signature and
// time-signature markers that govern it. Offsets and durations are in
// quarter-note lengths from the start of the score (f64), independent of the
// source file's tick resolution.
//
// Events are a tagged variant over {single pitch, chord, unpitched,
// percussion chord}. Consumers never branch on the variant to find pitches:
// `Event::pitches()` answers "which pitches does this event contribute, if
// any", and the classifier (classify.rs) answers "is this percussion".
//
// The score provider (midi.rs) builds these values once per file; nothing
// downstream mutates them.

use crate::key::Key;
use std::collections::BTreeMap;

/// Zero-based MIDI channel reserved for percussion by General MIDI
/// (channel 10 in one-based numbering).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// One analyzed input file.
#[derive(Debug, Clone, Default)]
pub struct Score {
    pub parts: Vec<Part>,
    /// Every tempo indication in the file, sorted by offset.
    pub tempo_marks: Vec<TempoMark>,
}

impl Score {
    /// BPM of the earliest tempo indication, if the score has one.
    pub fn first_tempo(&self) -> Option<f64> {
        self.tempo_marks.first().map(|t| t.bpm)
    }
}

/// A tempo indication: quarter-note beats per minute from `offset` onward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoMark {
    pub offset: f64,
    pub bpm: f64,
}

/// An instrument assignment inside a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    /// Zero-based MIDI channel.
    pub channel: u8,
}

impl Instrument {
    pub fn is_percussion(&self) -> bool {
        self.channel == PERCUSSION_CHANNEL
    }
}

/// An explicit key signature in a part.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySignatureMarker {
    pub offset: f64,
    pub key: Key,
}

/// A single voice or instrument line.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Track name, or a generated "track N" / "channel N".
    pub id: String,
    pub instruments: Vec<Instrument>,
    pub measures: Vec<Measure>,
    /// Key signatures in offset order.
    pub key_signatures: Vec<KeySignatureMarker>,
    /// Time signatures in offset order.
    pub time_signatures: Vec<TimeSignature>,
}

impl Part {
    /// All events of the part, measure by measure.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.measures.iter().flat_map(|m| m.events.iter())
    }
}

/// A time signature placed at an offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignature {
    pub offset: f64,
    pub numerator: u8,
    pub denominator: u32,
}

impl TimeSignature {
    /// "numerator/denominator", e.g. "3/4".
    pub fn label(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }

    /// Length of one bar in quarter notes.
    pub fn bar_length(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

/// One bar of a part that holds events.
#[derive(Debug, Clone, Default)]
pub struct Measure {
    /// Offset of the bar's downbeat.
    pub offset: f64,
    pub events: Vec<Event>,
}

/// A note-level event: something sounding from `offset` for `duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub offset: f64,
    pub duration: f64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// One pitched note (MIDI pitch).
    Note { pitch: u8 },
    /// Several distinct pitches sounding together, ascending.
    Chord { pitches: Vec<u8> },
    /// One percussion hit; `key` selects the drum sound, not a pitch.
    Unpitched { key: u8 },
    /// Several simultaneous percussion hits.
    PercussionChord { keys: Vec<u8> },
}

impl Event {
    /// Pitches this event contributes to harmony, or None if it has none.
    pub fn pitches(&self) -> Option<&[u8]> {
        match &self.kind {
            EventKind::Note { pitch } => Some(std::slice::from_ref(pitch)),
            EventKind::Chord { pitches } if !pitches.is_empty() => Some(pitches),
            EventKind::Chord { .. } => None,
            EventKind::Unpitched { .. } | EventKind::PercussionChord { .. } => None,
        }
    }

    pub fn is_chord(&self) -> bool {
        matches!(self.kind, EventKind::Chord { .. })
    }
}

/// Group events into the measures that hold them.
///
/// Bars follow the time signatures (4/4 until the first one). A signature
/// starts a new run of bars at its offset, cutting short any bar it falls
/// inside. Each event's bar is computed from the start of its run, and only
/// bars holding at least one event are returned, in offset order.
pub fn build_measures(events: Vec<Event>, time_signatures: &[TimeSignature]) -> Vec<Measure> {
    // (start offset, bar length) runs, ascending by start.
    let mut runs: Vec<(f64, f64)> = vec![(0.0, 4.0)];
    for signature in time_signatures {
        let start = signature.offset.max(0.0);
        let previous = runs.last().map_or(4.0, |&(_, length)| length);
        let length = match signature.bar_length() {
            length if length > 0.0 => length,
            _ => previous,
        };
        match runs.last_mut() {
            Some(last) if last.0 >= start => last.1 = length,
            _ => runs.push((start, length)),
        }
    }

    let mut measures: BTreeMap<(usize, u64), Measure> = BTreeMap::new();
    for event in events {
        let run = runs
            .partition_point(|&(start, _)| start <= event.offset)
            .saturating_sub(1);
        let (start, length) = runs[run];
        // `as` saturates, so offsets before the run clamp to its first bar.
        let bar = ((event.offset - start) / length).floor() as u64;
        measures
            .entry((run, bar))
            .or_insert_with(|| Measure {
                offset: start + bar as f64 * length,
                events: Vec::new(),
            })
            .events
            .push(event);
    }

    measures.into_values().collect()
}

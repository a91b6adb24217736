// MIDI input: builds a Score from a Standard MIDI File (SMF).
//
// Uses the `midly` crate for parsing. Only metrical timing (ticks per quarter
// note) is supported; ticks are converted to quarter-note offsets right away
// so nothing downstream sees the file's tick resolution.
//
// Part layout:
// - Format 0 (one track): one part per channel that plays notes. All meta
//   events in the track are shared by every part.
// - Format 1/2: one part per track that plays notes. Tracks without notes are
//   conductor tracks whose key and time signatures apply to every part; a
//   note track's own signatures apply to that part only.
// - Tempo events from every track feed the score-wide tempo map.
//
// Notes are paired FIFO per (channel, key): a NoteOn opens, a NoteOff or a
// zero-velocity NoteOn closes the oldest open note. Notes still sounding at
// the end of a track end there. Notes of one part that start on the same tick
// become one event; on channel 10 they are unpitched hits.

use crate::error::AnalyzerError;
use crate::key::Key;
use crate::score::{
    Event, EventKind, Instrument, KeySignatureMarker, PERCUSSION_CHANNEL, Part, Score, TempoMark,
    TimeSignature, build_measures,
};
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

/// Read and parse a MIDI file.
pub fn load_score(path: &Path) -> Result<Score, AnalyzerError> {
    let data = std::fs::read(path).map_err(|e| AnalyzerError::io(path, e))?;
    build_score(&data).map_err(|reason| AnalyzerError::parse(path, reason))
}

/// Parse an in-memory MIDI file.
pub fn parse_score(bytes: &[u8]) -> Result<Score, AnalyzerError> {
    build_score(bytes).map_err(|reason| AnalyzerError::parse("<memory>", reason))
}

/// A note with absolute tick bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawNote {
    channel: u8,
    key: u8,
    start: u64,
    end: u64,
}

/// Key and time signatures with tick positions, before conversion.
#[derive(Debug, Clone, Default)]
struct RawMarkers {
    keys: Vec<(u64, i8, bool)>,
    /// (tick, numerator, denominator as a power of two)
    time_signatures: Vec<(u64, u8, u8)>,
}

impl RawMarkers {
    fn extend(&mut self, other: &RawMarkers) {
        self.keys.extend_from_slice(&other.keys);
        self.time_signatures.extend_from_slice(&other.time_signatures);
    }
}

/// Everything collected from one track.
#[derive(Debug, Default)]
struct TrackScan {
    name: Option<String>,
    notes: Vec<RawNote>,
    /// (tick, microseconds per quarter)
    tempos: Vec<(u64, u32)>,
    markers: RawMarkers,
}

fn scan_track(track: &[TrackEvent<'_>]) -> TrackScan {
    let mut scan = TrackScan::default();
    let mut open: BTreeMap<(u8, u8), VecDeque<u64>> = BTreeMap::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += event.delta.as_int() as u64;
        match event.kind {
            TrackEventKind::Midi { channel, message } => {
                let channel = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.entry((channel, key.as_int())).or_default().push_back(tick);
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let key = key.as_int();
                        let opened = open.get_mut(&(channel, key)).and_then(|q| q.pop_front());
                        if let Some(start) = opened {
                            scan.notes.push(RawNote {
                                channel,
                                key,
                                start,
                                end: tick,
                            });
                        }
                    }
                    _ => {}
                }
            }
            TrackEventKind::Meta(meta) => match meta {
                MetaMessage::TrackName(bytes) if scan.name.is_none() => {
                    let name = String::from_utf8_lossy(bytes).trim().to_string();
                    if !name.is_empty() {
                        scan.name = Some(name);
                    }
                }
                MetaMessage::Tempo(tempo) => scan.tempos.push((tick, tempo.as_int())),
                MetaMessage::KeySignature(sharps, minor) => {
                    scan.markers.keys.push((tick, sharps, minor));
                }
                MetaMessage::TimeSignature(numerator, denominator_pow, _, _) => {
                    scan.markers.time_signatures.push((tick, numerator, denominator_pow));
                }
                _ => {}
            },
            _ => {}
        }
    }

    // Close anything left sounding at the end of the track.
    for ((channel, key), starts) in open {
        for start in starts {
            scan.notes.push(RawNote {
                channel,
                key,
                start,
                end: tick,
            });
        }
    }
    scan.notes.sort_by_key(|n| (n.start, n.channel, n.key));
    scan
}

/// Notes and markers destined for one part.
struct PartSource {
    id: String,
    notes: Vec<RawNote>,
    markers: RawMarkers,
}

fn build_score(bytes: &[u8]) -> Result<Score, String> {
    let smf = Smf::parse(bytes).map_err(|e| e.to_string())?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int(),
        Timing::Timecode(..) => return Err("SMPTE timecode timing is not supported".into()),
    };
    if ticks_per_quarter == 0 {
        return Err("tick division of zero".into());
    }
    let tpq = ticks_per_quarter as f64;

    let scans: Vec<TrackScan> = smf.tracks.iter().map(Vec::as_slice).map(scan_track).collect();

    let mut tempo_marks = Vec::new();
    for scan in &scans {
        for &(tick, micros) in &scan.tempos {
            if micros == 0 {
                log::warn!("ignoring zero tempo at tick {tick}");
                continue;
            }
            tempo_marks.push(TempoMark {
                offset: tick as f64 / tpq,
                bpm: 60_000_000.0 / micros as f64,
            });
        }
    }
    tempo_marks.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    let mut conductor = RawMarkers::default();
    let mut sources = Vec::new();
    match smf.header.format {
        Format::SingleTrack => {
            for scan in &scans {
                conductor.extend(&scan.markers);
                let mut by_channel: BTreeMap<u8, Vec<RawNote>> = BTreeMap::new();
                for note in &scan.notes {
                    by_channel.entry(note.channel).or_default().push(*note);
                }
                for (channel, notes) in by_channel {
                    sources.push(PartSource {
                        id: format!("channel {}", channel + 1),
                        notes,
                        markers: RawMarkers::default(),
                    });
                }
            }
        }
        Format::Parallel | Format::Sequential => {
            for (index, scan) in scans.iter().enumerate() {
                if scan.notes.is_empty() {
                    conductor.extend(&scan.markers);
                    continue;
                }
                sources.push(PartSource {
                    id: scan
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("track {}", index + 1)),
                    notes: scan.notes.clone(),
                    markers: scan.markers.clone(),
                });
            }
        }
    }

    let parts = sources
        .into_iter()
        .map(|source| build_part(source, &conductor, tpq))
        .collect::<Vec<_>>();
    log::debug!(
        "parsed {} part(s), {} tempo mark(s), {} ticks per quarter",
        parts.len(),
        tempo_marks.len(),
        ticks_per_quarter
    );

    Ok(Score { parts, tempo_marks })
}

fn build_part(source: PartSource, conductor: &RawMarkers, tpq: f64) -> Part {
    let mut markers = conductor.clone();
    markers.extend(&source.markers);
    markers.keys.sort_by_key(|&(tick, _, _)| tick);
    markers.time_signatures.sort_by_key(|&(tick, _, _)| tick);

    let key_signatures = markers
        .keys
        .iter()
        .filter_map(|&(tick, sharps, minor)| match Key::from_signature(sharps, minor) {
            Some(key) => Some(KeySignatureMarker {
                offset: tick as f64 / tpq,
                key,
            }),
            None => {
                log::warn!("part '{}': ignoring key signature with {sharps} sharps", source.id);
                None
            }
        })
        .collect();

    let time_signatures: Vec<TimeSignature> = markers
        .time_signatures
        .iter()
        .filter_map(|&(tick, numerator, denominator_pow)| {
            let denominator = 1u32.checked_shl(denominator_pow as u32);
            match denominator {
                Some(denominator) if numerator > 0 => Some(TimeSignature {
                    offset: tick as f64 / tpq,
                    numerator,
                    denominator,
                }),
                _ => {
                    log::warn!(
                        "part '{}': ignoring time signature {numerator}/2^{denominator_pow}",
                        source.id
                    );
                    None
                }
            }
        })
        .collect();

    let channels: BTreeSet<u8> = source.notes.iter().map(|n| n.channel).collect();
    let instruments = channels
        .into_iter()
        .map(|channel| Instrument { channel })
        .collect();

    let events = group_events(&source.notes, tpq);
    Part {
        id: source.id,
        instruments,
        measures: build_measures(events, &time_signatures),
        key_signatures,
        time_signatures,
    }
}

/// Merge notes that start together into events. `notes` is sorted by start.
fn group_events(notes: &[RawNote], tpq: f64) -> Vec<Event> {
    let mut events = Vec::new();
    for group in notes.chunk_by(|a, b| a.start == b.start) {
        let offset = group[0].start as f64 / tpq;
        let (drums, pitched): (Vec<&RawNote>, Vec<&RawNote>) =
            group.iter().partition(|n| n.channel == PERCUSSION_CHANNEL);

        for (members, percussion) in [(pitched, false), (drums, true)] {
            if members.is_empty() {
                continue;
            }
            let longest = members.iter().map(|n| n.end - n.start).max().unwrap_or(0);
            let mut keys: Vec<u8> = members.iter().map(|n| n.key).collect();
            keys.sort_unstable();
            keys.dedup();

            let kind = match (percussion, keys.len()) {
                (false, 1) => EventKind::Note { pitch: keys[0] },
                (false, _) => EventKind::Chord { pitches: keys },
                (true, 1) => EventKind::Unpitched { key: keys[0] },
                (true, _) => EventKind::PercussionChord { keys },
            };
            events.push(Event {
                offset,
                duration: longest as f64 / tpq,
                kind,
            });
        }
    }
    events
}

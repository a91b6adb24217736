// Roman numeral labels for chords relative to a key.
//
// Two steps: identify the chord (root, quality, bass) by matching its
// pitch-class set against triad and seventh templates, then spell the root as
// a scale degree of the key with case, quality mark, and inversion figure.
//
// Template scoring rewards covered pitch classes and penalizes both foreign
// pitch classes and missing template tones: `2*matched - 3*extra - missing`.
// Only pitch classes present in the chord are tried as roots. Ties prefer the
// bass as root, then the earlier template (triads before sevenths), so a bare
// fifth reads as a major triad and symmetric chords (augmented, diminished
// seventh) take their bass as root.
//
// Degrees are measured against the major scale in major keys and the natural
// minor scale in minor keys, with "b"/"#" for altered roots ("bVII", "#iv").
// In minor, a diminished-family chord on the leading tone is written "viio"
// rather than "#viio".
//
// Figures: triads "", "6", "64"; sevenths "7", "65", "43", "42". A bass that
// is not a chord tone counts as root position.

use crate::key::{Key, Mode};

/// Chord qualities recognized by template matching, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    DominantSeventh,
    MajorSeventh,
    MinorSeventh,
    HalfDiminishedSeventh,
    DiminishedSeventh,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; 9] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::DominantSeventh,
        ChordQuality::MajorSeventh,
        ChordQuality::MinorSeventh,
        ChordQuality::HalfDiminishedSeventh,
        ChordQuality::DiminishedSeventh,
    ];

    /// Semitones above the root, root first.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::DominantSeventh => &[0, 4, 7, 10],
            ChordQuality::MajorSeventh => &[0, 4, 7, 11],
            ChordQuality::MinorSeventh => &[0, 3, 7, 10],
            ChordQuality::HalfDiminishedSeventh => &[0, 3, 6, 10],
            ChordQuality::DiminishedSeventh => &[0, 3, 6, 9],
        }
    }

    pub fn is_seventh(self) -> bool {
        self.intervals().len() == 4
    }

    /// Upper-case numerals for chords with a major third.
    fn is_major_family(self) -> bool {
        matches!(
            self,
            ChordQuality::Major
                | ChordQuality::Augmented
                | ChordQuality::DominantSeventh
                | ChordQuality::MajorSeventh
        )
    }

    fn is_diminished_family(self) -> bool {
        matches!(
            self,
            ChordQuality::Diminished
                | ChordQuality::HalfDiminishedSeventh
                | ChordQuality::DiminishedSeventh
        )
    }

    fn mark(self) -> &'static str {
        match self {
            ChordQuality::Diminished | ChordQuality::DiminishedSeventh => "o",
            ChordQuality::HalfDiminishedSeventh => "ø",
            ChordQuality::Augmented => "+",
            _ => "",
        }
    }
}

/// A chord reduced to root, quality, and sounding bass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordIdentity {
    pub root_pc: u8,
    pub quality: ChordQuality,
    pub bass_pc: u8,
}

impl ChordIdentity {
    /// 0 = root position, 1 = first inversion, and so on.
    pub fn inversion(&self) -> usize {
        let bass_interval = (self.bass_pc + 12 - self.root_pc) % 12;
        self.quality
            .intervals()
            .iter()
            .position(|&i| i == bass_interval)
            .unwrap_or(0)
    }
}

/// Identify a chord from MIDI pitches. None for an empty pitch set.
pub fn identify_chord(pitches: &[u8]) -> Option<ChordIdentity> {
    let bass_pc = pitches.iter().min()? % 12;
    let mut pcs: Vec<u8> = pitches.iter().map(|p| p % 12).collect();
    pcs.sort_unstable();
    pcs.dedup();

    let mut best: Option<(i32, bool, usize, ChordIdentity)> = None;
    for &root in &pcs {
        for (order, quality) in ChordQuality::ALL.iter().enumerate() {
            let template: Vec<u8> = quality.intervals().iter().map(|i| (root + i) % 12).collect();
            let matched = pcs.iter().filter(|&&pc| template.contains(&pc)).count() as i32;
            let extra = pcs.len() as i32 - matched;
            let missing = template.len() as i32 - matched;
            let score = 2 * matched - 3 * extra - missing;
            let on_bass = root == bass_pc;

            let better = match &best {
                None => true,
                Some((best_score, best_on_bass, best_order, _)) => {
                    (score, on_bass, std::cmp::Reverse(order))
                        > (*best_score, *best_on_bass, std::cmp::Reverse(*best_order))
                }
            };
            if better {
                best = Some((
                    score,
                    on_bass,
                    order,
                    ChordIdentity {
                        root_pc: root,
                        quality: *quality,
                        bass_pc,
                    },
                ));
            }
        }
    }
    best.map(|(_, _, _, identity)| identity)
}

const NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

/// Scale degree (0-based) and alteration per semitone above a major tonic.
const MAJOR_DEGREES: [(usize, &str); 12] = [
    (0, ""), (1, "b"), (1, ""), (2, "b"), (2, ""), (3, ""),
    (3, "#"), (4, ""), (5, "b"), (5, ""), (6, "b"), (6, ""),
];

/// Scale degree and alteration per semitone above a minor tonic.
const MINOR_DEGREES: [(usize, &str); 12] = [
    (0, ""), (1, "b"), (1, ""), (2, ""), (2, "#"), (3, ""),
    (3, "#"), (4, ""), (5, ""), (5, "#"), (6, ""), (6, "#"),
];

/// Roman numeral figure for an identified chord in `key`.
pub fn figure(chord: &ChordIdentity, key: &Key) -> String {
    let interval = (chord.root_pc + 12 - key.tonic_pc) % 12;
    let (degree, mut accidental) = match key.mode {
        Mode::Major => MAJOR_DEGREES[interval as usize],
        Mode::Minor => MINOR_DEGREES[interval as usize],
    };
    if key.mode == Mode::Minor && interval == 11 && chord.quality.is_diminished_family() {
        accidental = "";
    }

    let numeral = if chord.quality.is_major_family() {
        NUMERALS[degree].to_string()
    } else {
        NUMERALS[degree].to_lowercase()
    };

    let inversion_figures: &[&str] = if chord.quality.is_seventh() {
        &["7", "65", "43", "42"]
    } else {
        &["", "6", "64"]
    };
    let inversion = inversion_figures[chord.inversion().min(inversion_figures.len() - 1)];

    format!("{accidental}{numeral}{}{inversion}", chord.quality.mark())
}

/// Roman numeral figure for raw MIDI pitches in `key`, or None if the chord
/// has no pitches.
pub fn roman_numeral(pitches: &[u8], key: &Key) -> Option<String> {
    identify_chord(pitches).map(|chord| figure(&chord, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_major() -> Key {
        Key::new(0, Mode::Major)
    }

    fn a_minor() -> Key {
        Key::new(9, Mode::Minor)
    }

    fn rn(pitches: &[u8], key: &Key) -> String {
        roman_numeral(pitches, key).unwrap()
    }

    #[test]
    fn test_identify_triads() {
        let c = identify_chord(&[60, 64, 67]).unwrap();
        assert_eq!((c.root_pc, c.quality), (0, ChordQuality::Major));

        let d_minor = identify_chord(&[65, 62, 69]).unwrap();
        assert_eq!((d_minor.root_pc, d_minor.quality), (2, ChordQuality::Minor));
        assert_eq!(d_minor.inversion(), 0);

        let b_dim = identify_chord(&[59, 62, 65]).unwrap();
        assert_eq!(b_dim.quality, ChordQuality::Diminished);
    }

    #[test]
    fn test_identify_sevenths() {
        let g7 = identify_chord(&[55, 59, 62, 65]).unwrap();
        assert_eq!((g7.root_pc, g7.quality), (7, ChordQuality::DominantSeventh));

        let fmaj7 = identify_chord(&[53, 57, 60, 64]).unwrap();
        assert_eq!(fmaj7.quality, ChordQuality::MajorSeventh);

        let half_dim = identify_chord(&[62, 65, 68, 72]).unwrap();
        assert_eq!(
            (half_dim.root_pc, half_dim.quality),
            (2, ChordQuality::HalfDiminishedSeventh)
        );
    }

    #[test]
    fn test_identify_partial_chords() {
        // Bare fifth reads as major.
        let fifth = identify_chord(&[48, 55]).unwrap();
        assert_eq!((fifth.root_pc, fifth.quality), (0, ChordQuality::Major));

        // Major third: root stays on C, not a rootless A minor.
        let third = identify_chord(&[60, 64]).unwrap();
        assert_eq!(third.root_pc, 0);

        assert!(identify_chord(&[]).is_none());
    }

    #[test]
    fn test_symmetric_chords_take_bass_root() {
        let aug = identify_chord(&[64, 68, 72]).unwrap();
        assert_eq!((aug.root_pc, aug.quality), (4, ChordQuality::Augmented));

        let dim7 = identify_chord(&[56, 59, 62, 65]).unwrap();
        assert_eq!((dim7.root_pc, dim7.quality), (8, ChordQuality::DiminishedSeventh));
    }

    #[test]
    fn test_major_key_figures() {
        let key = c_major();
        assert_eq!(rn(&[60, 64, 67], &key), "I");
        assert_eq!(rn(&[52, 60, 67], &key), "I6");
        assert_eq!(rn(&[55, 60, 64], &key), "I64");
        assert_eq!(rn(&[53, 62, 69], &key), "ii6");
        assert_eq!(rn(&[55, 59, 62, 65], &key), "V7");
        assert_eq!(rn(&[59, 62, 67, 65], &key), "V65");
        assert_eq!(rn(&[62, 65, 67, 71], &key), "V43");
        assert_eq!(rn(&[53, 59, 62, 67], &key), "V42");
        assert_eq!(rn(&[59, 62, 65], &key), "viio");
        assert_eq!(rn(&[58, 62, 65], &key), "bVII");
        assert_eq!(rn(&[53, 57, 60, 64], &key), "IV7");
        assert_eq!(rn(&[59, 62, 65, 69], &key), "viiø7");
    }

    #[test]
    fn test_minor_key_figures() {
        let key = a_minor();
        assert_eq!(rn(&[57, 60, 64], &key), "i");
        assert_eq!(rn(&[52, 56, 59], &key), "V");
        assert_eq!(rn(&[56, 59, 62, 65], &key), "viio7");
        assert_eq!(rn(&[53, 57, 60], &key), "VI");
        assert_eq!(rn(&[55, 59, 62], &key), "VII");
        assert_eq!(rn(&[60, 64, 67], &key), "III");
        assert_eq!(rn(&[66, 69, 72], &key), "#vio");
    }

    #[test]
    fn test_chromatic_roots_in_major() {
        let key = Key::new(7, Mode::Major);
        // Eb major triad in G major.
        assert_eq!(rn(&[63, 67, 70], &key), "bVI");
        // C# diminished in G major.
        assert_eq!(rn(&[61, 64, 67], &key), "#ivo");
    }
}

// Keys, key naming, and statistical key estimation.
//
// Tonal music here is modern major/minor, so a key is a tonic pitch class
// plus one of two modes. The tonic also carries a spelling ("F#" vs "Gb")
// because key names appear verbatim in the output: keys read from a MIDI key
// signature are spelled by the signature itself, keys produced by the
// estimator use the conventional spelling for that tonic and mode.
//
// Key names concatenate the spelling and the mode word: "Cmajor",
// "Bbminor". Key-change dedup and output both go through `Key::name()`.
//
// Estimation is a Krumhansl-Schmuckler correlation of a duration-weighted
// pitch-class histogram (histogram.rs) against the 24 rotated Krumhansl-Kessler
// profiles. It sits behind the `KeyEstimator` trait so another key finder can
// be swapped in without touching the extractors.

use crate::histogram::PitchClassHistogram;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Major or minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Mode word as it appears in key names.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }
}

/// Major tonics ordered by key signature, index 0 = seven flats.
const MAJOR_BY_SIGNATURE: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];

/// Minor tonics ordered by key signature, index 0 = seven flats.
const MINOR_BY_SIGNATURE: [&str; 15] = [
    "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
];

/// Conventional major-key spelling per tonic pitch class.
const MAJOR_SPELLING: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Conventional minor-key spelling per tonic pitch class.
const MINOR_SPELLING: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A", "Bb", "B",
];

/// A tonal center: spelled tonic plus mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Tonic spelling, e.g. "C", "F#", "Bb".
    pub tonic: String,
    /// Tonic pitch class (0 = C).
    pub tonic_pc: u8,
    pub mode: Mode,
}

impl Key {
    /// Key with the conventional spelling for `tonic_pc` in `mode`.
    pub fn new(tonic_pc: u8, mode: Mode) -> Self {
        let tonic_pc = tonic_pc % 12;
        let spelling = match mode {
            Mode::Major => MAJOR_SPELLING[tonic_pc as usize],
            Mode::Minor => MINOR_SPELLING[tonic_pc as usize],
        };
        Key {
            tonic: spelling.to_string(),
            tonic_pc,
            mode,
        }
    }

    /// Key described by a MIDI key signature: `sharps` in -7..=7 (negative
    /// counts flats). Returns None outside that range.
    pub fn from_signature(sharps: i8, minor: bool) -> Option<Self> {
        if !(-7..=7).contains(&sharps) {
            return None;
        }
        let index = (sharps + 7) as usize;
        // Each sharp moves the tonic a fifth up.
        let major_pc = (sharps as i32 * 7).rem_euclid(12) as u8;
        let (tonic, tonic_pc, mode) = if minor {
            (MINOR_BY_SIGNATURE[index], (major_pc + 9) % 12, Mode::Minor)
        } else {
            (MAJOR_BY_SIGNATURE[index], major_pc, Mode::Major)
        };
        Some(Key {
            tonic: tonic.to_string(),
            tonic_pc,
            mode,
        })
    }

    /// Output name: tonic followed by the mode word, e.g. "Aminor".
    pub fn name(&self) -> String {
        format!("{}{}", self.tonic, self.mode.label())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Result of a key estimate: the chosen key and its correlation score.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEstimate {
    pub key: Key,
    /// Pearson correlation of the histogram with the winning profile.
    pub correlation: f64,
}

/// Anything that can pick a best-fitting key for a pitch-class histogram.
pub trait KeyEstimator {
    fn estimate(&self, histogram: &PitchClassHistogram) -> KeyEstimate;
}

/// Krumhansl-Kessler major key profile (C major, index = pitch class).
pub const KRUMHANSL_MAJOR: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor key profile (C minor).
pub const KRUMHANSL_MINOR: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Krumhansl-Schmuckler key finding.
///
/// Tonics are scanned C through B, major before minor, and only a strictly
/// greater correlation replaces the current best. Ties therefore resolve to
/// the lowest tonic, major first; an all-zero histogram yields C major.
#[derive(Debug, Clone)]
pub struct KrumhanslSchmuckler {
    pub major_profile: [f64; 12],
    pub minor_profile: [f64; 12],
}

impl Default for KrumhanslSchmuckler {
    fn default() -> Self {
        KrumhanslSchmuckler {
            major_profile: KRUMHANSL_MAJOR,
            minor_profile: KRUMHANSL_MINOR,
        }
    }
}

impl KeyEstimator for KrumhanslSchmuckler {
    fn estimate(&self, histogram: &PitchClassHistogram) -> KeyEstimate {
        let bins = histogram.bins();
        let mut best = KeyEstimate {
            key: Key::new(0, Mode::Major),
            correlation: f64::NEG_INFINITY,
        };

        for tonic in 0..12u8 {
            // Rotate so the candidate tonic sits at index 0.
            let mut rotated = [0.0; 12];
            for (i, slot) in rotated.iter_mut().enumerate() {
                *slot = bins[(i + tonic as usize) % 12];
            }

            for (mode, profile) in [
                (Mode::Major, &self.major_profile),
                (Mode::Minor, &self.minor_profile),
            ] {
                let r = pearson(&rotated, profile);
                if r > best.correlation {
                    best = KeyEstimate {
                        key: Key::new(tonic, mode),
                        correlation: r,
                    };
                }
            }
        }

        best
    }
}

/// Pearson correlation of two 12-bin vectors. Zero when either is constant.
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean = x.iter().sum::<f64>() / 12.0;
    let y_mean = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let xd = xi - x_mean;
        let yd = yi - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-12 { 0.0 } else { num / denom }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram_of(weights: &[(u8, f64)]) -> PitchClassHistogram {
        let mut h = PitchClassHistogram::new();
        for &(pc, w) in weights {
            h.add(pc, w);
        }
        h
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::new(0, Mode::Major).name(), "Cmajor");
        assert_eq!(Key::new(9, Mode::Minor).name(), "Aminor");
        assert_eq!(Key::new(10, Mode::Major).name(), "Bbmajor");
        assert_eq!(Key::new(1, Mode::Minor).name(), "C#minor");
        assert_eq!(Key::new(13, Mode::Major).tonic_pc, 1);
    }

    #[test]
    fn test_from_signature() {
        let c = Key::from_signature(0, false).unwrap();
        assert_eq!(c.name(), "Cmajor");

        let g = Key::from_signature(1, false).unwrap();
        assert_eq!((g.tonic_pc, g.name().as_str()), (7, "Gmajor"));

        let d_minor = Key::from_signature(-1, true).unwrap();
        assert_eq!((d_minor.tonic_pc, d_minor.name().as_str()), (2, "Dminor"));

        // Enharmonic signatures keep their own spelling.
        assert_eq!(Key::from_signature(6, false).unwrap().name(), "F#major");
        assert_eq!(Key::from_signature(-6, false).unwrap().name(), "Gbmajor");
        assert_eq!(Key::from_signature(-7, false).unwrap().tonic_pc, 11);

        assert!(Key::from_signature(8, false).is_none());
        assert!(Key::from_signature(-8, true).is_none());
    }

    #[test]
    fn test_c_major_scale_estimate() {
        // C D E F G A B with tonic and dominant emphasized.
        let h = histogram_of(&[
            (0, 4.0), (2, 1.0), (4, 2.0), (5, 1.0), (7, 3.0), (9, 1.0), (11, 1.0),
        ]);
        let est = KrumhanslSchmuckler::default().estimate(&h);
        assert_eq!(est.key.name(), "Cmajor");
        assert!(est.correlation > 0.7, "correlation {}", est.correlation);
    }

    #[test]
    fn test_a_minor_triad_estimate() {
        // A minor tonic triad, A heaviest.
        let h = histogram_of(&[(9, 4.0), (0, 2.0), (4, 2.5), (11, 0.5), (2, 0.5)]);
        let est = KrumhanslSchmuckler::default().estimate(&h);
        assert_eq!(est.key.mode, Mode::Minor);
        assert_eq!(est.key.tonic_pc, 9);
    }

    #[test]
    fn test_isolated_pitch_class_is_deterministic() {
        let h = histogram_of(&[(0, 4.0)]);
        let estimator = KrumhanslSchmuckler::default();
        let first = estimator.estimate(&h);
        for _ in 0..5 {
            assert_eq!(estimator.estimate(&h), first);
        }
        // Both profiles peak at their tonic, so an isolated C picks a C key.
        assert_eq!(first.key.tonic_pc, 0);
    }

    #[test]
    fn test_empty_histogram_falls_back_to_c_major() {
        let est = KrumhanslSchmuckler::default().estimate(&PitchClassHistogram::new());
        assert_eq!(est.key, Key::new(0, Mode::Major));
        assert_eq!(est.correlation, 0.0);
    }

    #[test]
    fn test_pearson_self_correlation() {
        let r = pearson(&KRUMHANSL_MAJOR, &KRUMHANSL_MAJOR);
        assert!((r - 1.0).abs() < 1e-10);
    }
}

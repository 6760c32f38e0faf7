//! Chord labels and display-time transposition
//!
//! Detected chords always describe the original key. Key shift and capo are
//! applied only when a label is displayed, as plain modular arithmetic on
//! the root.

use std::fmt;
use std::str::FromStr;

/// Chromatic note names, index 0 = C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Label used for windows without usable pitch content
pub const NO_CHORD: &str = "N.C.";

/// Quality suffix attached to every detected root
pub const MAJOR_SUFFIX: &str = " Maj";

/// Pitch class (0-11, where 0=C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Create a pitch class, wrapping into 0-11
    pub fn new(index: u8) -> Self {
        Self(index % 12)
    }

    /// Look up a pitch class by its sharp-spelled name
    pub fn from_name(name: &str) -> Option<Self> {
        NOTE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self(i as u8))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }

    /// Move by a signed number of semitones (mod 12)
    pub fn transpose(self, semitones: i32) -> Self {
        Self((self.0 as i32 + semitones).rem_euclid(12) as u8)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a chord sequence
///
/// Quality is always major: the estimator only finds a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordLabel {
    Major(PitchClass),
    NoChord,
}

impl ChordLabel {
    pub fn root(&self) -> Option<PitchClass> {
        match self {
            ChordLabel::Major(root) => Some(*root),
            ChordLabel::NoChord => None,
        }
    }

    /// Label as it should be shown for a display offset
    pub fn transposed(self, semitones: i32) -> Self {
        match self {
            ChordLabel::Major(root) => ChordLabel::Major(root.transpose(semitones)),
            ChordLabel::NoChord => ChordLabel::NoChord,
        }
    }
}

impl fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordLabel::Major(root) => write!(f, "{}{}", root, MAJOR_SUFFIX),
            ChordLabel::NoChord => f.write_str(NO_CHORD),
        }
    }
}

/// Error returned when a string is not a chord label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a chord label: {0:?}")]
pub struct ParseChordError(String);

impl FromStr for ChordLabel {
    type Err = ParseChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NO_CHORD {
            return Ok(ChordLabel::NoChord);
        }

        s.strip_suffix(MAJOR_SUFFIX)
            .and_then(PitchClass::from_name)
            .map(ChordLabel::Major)
            .ok_or_else(|| ParseChordError(s.to_string()))
    }
}

/// Offset applied to raw labels for display: `key_shift - capo` (mod 12)
pub fn display_offset(key_shift: i32, capo: u8) -> i32 {
    (key_shift - capo as i32).rem_euclid(12)
}

/// Transpose a raw label string for display
///
/// The first whitespace-delimited token is the root. Recognized roots are
/// moved by `offset` semitones and the rest of the label is kept verbatim;
/// anything else (e.g. "N.C.") is returned unchanged.
pub fn display_label(raw: &str, offset: i32) -> String {
    let root_len = raw.find(char::is_whitespace).unwrap_or(raw.len());
    let (root, suffix) = raw.split_at(root_len);

    match PitchClass::from_name(root) {
        Some(pc) => format!("{}{}", pc.transpose(offset), suffix),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_names() {
        assert_eq!(PitchClass::new(0).name(), "C");
        assert_eq!(PitchClass::new(13).name(), "C#");
        assert_eq!(PitchClass::from_name("A#"), Some(PitchClass::new(10)));
        assert_eq!(PitchClass::from_name("Bb"), None);
    }

    #[test]
    fn test_transpose_wraps() {
        let b = PitchClass::from_name("B").unwrap();
        assert_eq!(b.transpose(1).name(), "C");
        assert_eq!(b.transpose(-12), b);
        assert_eq!(PitchClass::new(0).transpose(-1).name(), "B");
    }

    #[test]
    fn test_label_display_and_parse() {
        let label = ChordLabel::Major(PitchClass::new(7));
        assert_eq!(label.to_string(), "G Maj");
        assert_eq!("G Maj".parse::<ChordLabel>(), Ok(label));
        assert_eq!("N.C.".parse::<ChordLabel>(), Ok(ChordLabel::NoChord));
        assert!("Gm".parse::<ChordLabel>().is_err());
    }

    #[test]
    fn test_display_label_shifts_root() {
        assert_eq!(display_label("C Maj", 2), "D Maj");
        assert_eq!(display_label("A# Maj", 3), "C# Maj");
        assert_eq!(display_label("E Maj", -5), "B Maj");
    }

    #[test]
    fn test_display_label_passthrough() {
        assert_eq!(display_label("N.C.", 5), "N.C.");
        assert_eq!(display_label("", 5), "");
        assert_eq!(display_label("Hm Maj", 1), "Hm Maj");
    }

    #[test]
    fn test_display_label_round_trip() {
        for name in NOTE_NAMES {
            let raw = format!("{name} Maj");
            for k in -30..30 {
                let shifted = display_label(&raw, k);
                assert_eq!(display_label(&shifted, -k), raw, "offset {k}");
            }
        }
    }

    #[test]
    fn test_display_label_periodic() {
        for name in NOTE_NAMES {
            let raw = format!("{name} Maj");
            for k in -15..15 {
                assert_eq!(display_label(&raw, k), display_label(&raw, k + 12));
            }
        }
    }

    #[test]
    fn test_typed_and_string_transposition_agree() {
        for i in 0..12u8 {
            let label = ChordLabel::Major(PitchClass::new(i));
            for k in -13..13 {
                assert_eq!(
                    label.transposed(k).to_string(),
                    display_label(&label.to_string(), k)
                );
            }
        }
    }

    #[test]
    fn test_display_offset() {
        assert_eq!(display_offset(0, 0), 0);
        assert_eq!(display_offset(2, 0), 2);
        assert_eq!(display_offset(0, 3), 9);
        assert_eq!(display_offset(-14, 1), 9);
    }
}

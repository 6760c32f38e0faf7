//! Guitar fingerings for displayed chords
//!
//! Two tables per root: open-position shapes for beginners and barre shapes
//! for advanced players. Positions are `(string, fret)` with string 1 the
//! high E and string 6 the low E.

use std::fmt;
use std::str::FromStr;

use crate::chord::{ChordLabel, PitchClass};

/// One fretted note: `(string 1-6, fret)`
pub type FretPosition = (u8, u8);

/// Which fingering table chord diagrams use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChordMode {
    /// Open chords near the nut
    #[default]
    Beginner,
    /// E-shape and A-shape barre chords
    Advanced,
}

impl ChordMode {
    pub fn name(self) -> &'static str {
        match self {
            ChordMode::Beginner => "beginner",
            ChordMode::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ChordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unknown chord mode name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chord mode {0:?} (expected \"beginner\" or \"advanced\")")]
pub struct ParseChordModeError(String);

impl FromStr for ChordMode {
    type Err = ParseChordModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(ChordMode::Beginner),
            "advanced" => Ok(ChordMode::Advanced),
            _ => Err(ParseChordModeError(s.to_string())),
        }
    }
}

/// Open major shapes, indexed by pitch class (0 = C)
const BEGINNER_MAJOR: [&[FretPosition]; 12] = [
    &[(5, 3), (4, 2), (2, 1)],
    &[(4, 3), (3, 1), (2, 2), (1, 1)],
    &[(3, 2), (1, 2), (2, 3)],
    &[(4, 1), (3, 3), (2, 4), (1, 3)],
    &[(5, 2), (4, 2), (3, 1)],
    &[(4, 3), (3, 2), (2, 1), (1, 1)],
    &[(4, 4), (3, 3), (2, 2)],
    &[(6, 3), (5, 2), (1, 3)],
    &[(4, 6), (3, 5), (2, 4), (1, 4)],
    &[(4, 2), (3, 2), (2, 2)],
    &[(4, 3), (3, 3), (2, 3), (1, 1)],
    &[(4, 4), (3, 4), (2, 4)],
];

/// Barre major shapes, indexed by pitch class (0 = C)
///
/// F through A# use the E shape, B through E the A shape.
const ADVANCED_MAJOR: [&[FretPosition]; 12] = [
    &[(5, 3), (4, 5), (3, 5), (2, 5), (1, 3)],
    &[(5, 4), (4, 6), (3, 6), (2, 6), (1, 4)],
    &[(5, 5), (4, 7), (3, 7), (2, 7), (1, 5)],
    &[(5, 6), (4, 8), (3, 8), (2, 8), (1, 6)],
    &[(5, 7), (4, 9), (3, 9), (2, 9), (1, 7)],
    &[(6, 1), (5, 3), (4, 3), (3, 2), (2, 1), (1, 1)],
    &[(6, 2), (5, 4), (4, 4), (3, 3), (2, 2), (1, 2)],
    &[(6, 3), (5, 5), (4, 5), (3, 4), (2, 3), (1, 3)],
    &[(6, 4), (5, 6), (4, 6), (3, 5), (2, 4), (1, 4)],
    &[(6, 5), (5, 7), (4, 7), (3, 6), (2, 5), (1, 5)],
    &[(6, 6), (5, 8), (4, 8), (3, 7), (2, 6), (1, 6)],
    &[(5, 2), (4, 4), (3, 4), (2, 4), (1, 2)],
];

/// Fingering of the major chord on `root`
pub fn chord_shape(root: PitchClass, mode: ChordMode) -> &'static [FretPosition] {
    let table = match mode {
        ChordMode::Beginner => &BEGINNER_MAJOR,
        ChordMode::Advanced => &ADVANCED_MAJOR,
    };
    table[root.index() as usize]
}

/// Fingering for a displayed label; empty for "N.C." and anything unparsed
pub fn shape_for_label(label: &str, mode: ChordMode) -> &'static [FretPosition] {
    match label.parse::<ChordLabel>().ok().and_then(|c| c.root()) {
        Some(root) => chord_shape(root, mode),
        None => &[],
    }
}

/// First fret a diagram of `shape` should show
///
/// Shapes that fit in the first five frets start at the nut; higher shapes
/// start at their lowest fretted note.
pub fn base_fret(shape: &[FretPosition]) -> u8 {
    let frets = shape.iter().map(|&(_, fret)| fret).filter(|&f| f > 0);
    match (frets.clone().min(), frets.max()) {
        (Some(low), Some(high)) if high > 5 => low,
        _ => 1,
    }
}

//! Helpers for laying a per-second chord sequence over a timeline

use crate::chord::ChordLabel;

/// A run of identical consecutive labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordSegment {
    pub label: ChordLabel,
    pub start_second: usize,
    pub duration_seconds: usize,
}

impl ChordSegment {
    pub fn end_second(&self) -> usize {
        self.start_second + self.duration_seconds
    }
}

/// Group consecutive equal labels into segments
pub fn chord_segments(labels: &[ChordLabel]) -> Vec<ChordSegment> {
    let mut segments: Vec<ChordSegment> = Vec::new();

    for (second, label) in labels.iter().enumerate() {
        match segments.last_mut() {
            Some(seg) if seg.label == *label => seg.duration_seconds += 1,
            _ => segments.push(ChordSegment {
                label: *label,
                start_second: second,
                duration_seconds: 1,
            }),
        }
    }

    segments
}

/// Distinct labels, sorted by their text
pub fn unique_chords(labels: &[ChordLabel]) -> Vec<ChordLabel> {
    let mut unique: Vec<ChordLabel> = Vec::new();
    for label in labels {
        if !unique.contains(label) {
            unique.push(*label);
        }
    }
    unique.sort_by_cached_key(|l| l.to_string());
    unique
}

/// Label under the playhead
pub fn chord_at(labels: &[ChordLabel], seconds: f64) -> Option<ChordLabel> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    labels.get(seconds.floor() as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::PitchClass;

    fn major(i: u8) -> ChordLabel {
        ChordLabel::Major(PitchClass::new(i))
    }

    #[test]
    fn test_segments_group_runs() {
        let labels = [major(0), major(0), major(7), ChordLabel::NoChord, major(0)];
        let segments = chord_segments(&labels);

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].duration_seconds, 2);
        assert_eq!(segments[1].start_second, 2);
        assert_eq!(segments[3].end_second(), 5);
        assert!(chord_segments(&[]).is_empty());
    }

    #[test]
    fn test_unique_sorted_by_text() {
        let labels = [major(7), major(0), major(9), major(0), ChordLabel::NoChord];
        let names: Vec<String> = unique_chords(&labels).iter().map(|l| l.to_string()).collect();
        assert_eq!(names, ["A Maj", "C Maj", "G Maj", "N.C."]);
    }

    #[test]
    fn test_chord_at_playhead() {
        let labels = [major(0), major(5)];
        assert_eq!(chord_at(&labels, 0.0), Some(major(0)));
        assert_eq!(chord_at(&labels, 1.99), Some(major(5)));
        assert_eq!(chord_at(&labels, 2.0), None);
        assert_eq!(chord_at(&labels, -0.5), None);
    }
}

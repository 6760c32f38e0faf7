//! Per-second chord estimation from a chromagram
//!
//! Each whole second of audio is reduced to the strongest average pitch
//! class and reported as a major chord on that root. Windows follow the
//! wall clock, not the beat grid.

use crate::chord::{ChordLabel, PitchClass};
use crate::chroma::{ChromaAnalyzer, ChromaFrame};

/// Average chroma energy below this yields "N.C."
const MIN_WINDOW_ENERGY: f32 = 1e-6;

/// Coarse chord estimator: one root per second
pub struct ChordEstimator {
    chroma: ChromaAnalyzer,
}

impl ChordEstimator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            chroma: ChromaAnalyzer::new(sample_rate),
        }
    }

    /// Estimate one label per whole second of a mono signal
    ///
    /// Returns `floor(duration)` labels; an empty signal yields none.
    pub fn estimate(&mut self, mono: &[f32]) -> Vec<ChordLabel> {
        let sample_rate = self.chroma.sample_rate();
        if mono.is_empty() || sample_rate == 0 {
            return Vec::new();
        }

        let seconds = mono.len() / sample_rate as usize;
        let frames = self.chroma.chromagram(mono);
        let fps = self.chroma.frames_per_second();

        let labels: Vec<ChordLabel> = (0..seconds)
            .map(|i| {
                let start = (i as f64 * fps) as usize;
                let end = (((i + 1) as f64 * fps) as usize).min(frames.len());
                if start >= end {
                    return ChordLabel::NoChord;
                }
                label_for_window(&frames[start..end])
            })
            .collect();

        let silent = labels.iter().filter(|l| **l == ChordLabel::NoChord).count();
        tracing::debug!(
            seconds,
            silent,
            "estimated chords from {} chroma frames",
            frames.len()
        );

        labels
    }
}

/// Root of the averaged chroma, or "N.C." for an empty/silent window
fn label_for_window(window: &[ChromaFrame]) -> ChordLabel {
    let mut average = [0.0f32; 12];
    for frame in window {
        for (acc, v) in average.iter_mut().zip(frame) {
            *acc += v;
        }
    }
    for v in &mut average {
        *v /= window.len() as f32;
    }

    // First maximum wins on ties
    let mut best = 0;
    for (i, v) in average.iter().enumerate() {
        if *v > average[best] {
            best = i;
        }
    }

    if average[best] <= MIN_WINDOW_ENERGY {
        return ChordLabel::NoChord;
    }

    ChordLabel::Major(PitchClass::new(best as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freqs: &[f32], sample_rate: u32, secs: f32) -> Vec<f32> {
        (0..(sample_rate as f32 * secs) as usize)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() / freqs.len() as f32
            })
            .collect()
    }

    #[test]
    fn test_empty_signal() {
        assert!(ChordEstimator::new(44100).estimate(&[]).is_empty());
    }

    #[test]
    fn test_sequence_length_is_floor_of_duration() {
        let mut estimator = ChordEstimator::new(22050);
        assert_eq!(estimator.estimate(&tone(&[440.0], 22050, 3.7)).len(), 3);
        assert_eq!(estimator.estimate(&tone(&[440.0], 22050, 0.9)).len(), 0);
        assert_eq!(estimator.estimate(&tone(&[440.0], 22050, 2.0)).len(), 2);
    }

    #[test]
    fn test_silence_is_no_chord() {
        let mut estimator = ChordEstimator::new(44100);
        let labels = estimator.estimate(&vec![0.0; 44100 * 3]);
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|l| *l == ChordLabel::NoChord));
    }

    #[test]
    fn test_pure_tones_give_their_root() {
        let mut estimator = ChordEstimator::new(44100);

        let a = estimator.estimate(&tone(&[440.0], 44100, 2.0));
        assert!(a.iter().all(|l| l.to_string() == "A Maj"), "{a:?}");

        let e = estimator.estimate(&tone(&[329.63], 44100, 2.0));
        assert!(e.iter().all(|l| l.to_string() == "E Maj"), "{e:?}");
    }

    #[test]
    fn test_root_follows_the_signal_each_second() {
        let sample_rate = 44100;
        let mut signal = tone(&[440.0], sample_rate, 2.0);
        signal.extend(vec![0.0; sample_rate as usize * 2]);

        let labels = ChordEstimator::new(sample_rate).estimate(&signal);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0].to_string(), "A Maj");
        assert_eq!(labels[3], ChordLabel::NoChord);
    }

    #[test]
    fn test_always_major_quality() {
        // A minor triad still comes out as a major chord on its strongest root
        let mut estimator = ChordEstimator::new(44100);
        let labels = estimator.estimate(&tone(&[220.0, 261.63, 329.63], 44100, 2.0));
        assert!(labels
            .iter()
            .all(|l| matches!(l, ChordLabel::Major(_)) && l.to_string().ends_with(" Maj")));
    }
}

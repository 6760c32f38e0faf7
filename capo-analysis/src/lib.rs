//! Audio analysis for CAPO
//!
//! Provides tempo estimation, chroma extraction and per-second chord labels,
//! plus the display-time transposition of those labels and guitar
//! fingerings for them.

mod chord;
mod chords;
mod chroma;
mod shapes;
mod tempo;
mod timeline;

pub use chord::{
    display_label, display_offset, ChordLabel, ParseChordError, PitchClass, MAJOR_SUFFIX,
    NOTE_NAMES, NO_CHORD,
};
pub use chords::ChordEstimator;
pub use chroma::{ChromaAnalyzer, ChromaFrame, CHROMA_HOP};
pub use shapes::{
    base_fret, chord_shape, shape_for_label, ChordMode, FretPosition, ParseChordModeError,
};
pub use tempo::{BeatTrack, TempoEstimator};
pub use timeline::{chord_at, chord_segments, unique_chords, ChordSegment};

/// Everything the analysis pass derives from one mono signal
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Estimated tempo; 0.0 when none could be found
    pub tempo_bpm: f32,
    /// One label per whole second of audio
    pub chords: Vec<ChordLabel>,
}

/// Run tempo and chord estimation over a mono signal
pub fn analyze(mono: &[f32], sample_rate: u32) -> AnalysisResult {
    let tempo_bpm = TempoEstimator::new(sample_rate).estimate(mono);
    let chords = ChordEstimator::new(sample_rate).estimate(mono);

    tracing::info!(
        tempo_bpm,
        seconds = chords.len(),
        "analysis complete"
    );

    AnalysisResult { tempo_bpm, chords }
}

//! Audio engine for CAPO
//!
//! - Timestretcher: phase vocoder and tempo-independent pitch shifting
//! - Render: the single temporary WAV holding the shifted track
//! - Engine: facade over load, analysis and shift
//! - Worker: background load + analysis with stale-result dropping
//! - Deck: key/capo/tempo controls over an external player

mod deck;
mod engine;
mod error;
mod render;
mod worker;
pub mod timestretcher;

pub use deck::{
    DeckState, PlaybackService, PracticeDeck, MAX_CAPO, MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE,
};
pub use engine::{AnalyzedTrack, Engine, EngineState, KeyShift};
pub use error::{EngineError, ShiftError};
pub use render::{RenderedTrack, RENDER_PREFIX};
pub use timestretcher::{FftSize, PhaseVocoder, PitchShifter, MAX_SEMITONES};
pub use worker::{AnalysisEvent, AnalysisRequest, AnalysisWorker, RequestId};

//! Error types for capo-audio

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use capo_library::LoadError;

/// Failure while rendering a pitch-shifted track
#[derive(Error, Debug)]
pub enum ShiftError {
    /// No track has been loaded
    #[error("No track loaded")]
    NoTrack,

    /// Shift amount outside the supported range
    #[error("Shift of {0} semitones is out of range")]
    OutOfRange(i32),

    /// I/O error while creating or writing the render
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WAV encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Resampling error
    #[error("Resampling error: {0}")]
    Resample(String),
}

impl From<hound::Error> for ShiftError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ShiftError::Io(io),
            other => ShiftError::Encoding(other.to_string()),
        }
    }
}

impl From<rubato::ResamplerConstructionError> for ShiftError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        ShiftError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for ShiftError {
    fn from(e: rubato::ResampleError) -> Self {
        ShiftError::Resample(e.to_string())
    }
}

/// Engine facade errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Shift(#[from] ShiftError),

    /// Analysis was requested before any track was loaded
    #[error("No track loaded")]
    NoTrack,

    /// The analysis worker is gone
    #[error("Analysis worker disconnected")]
    WorkerDisconnected,

    /// Background analysis of a track failed
    #[error("Analysis of {path} failed: {message}")]
    Analysis { path: PathBuf, message: String },
}

/// Result type for render operations
pub type Result<T> = std::result::Result<T, ShiftError>;

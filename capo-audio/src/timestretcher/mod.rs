//! Tempo-independent pitch shifting
//!
//! A shift by `n` semitones is a phase-vocoder time stretch by `2^(n/12)`
//! followed by resampling back to the original length, which moves every
//! partial by the same ratio while keeping the duration.
//!
//! ```rust,ignore
//! use capo_audio::timestretcher::{FftSize, PitchShifter};
//!
//! let shifter = PitchShifter::new(FftSize::Medium);
//! let shifted = shifter.shift(&buffer, 2)?; // up a whole tone
//! assert_eq!(shifted.frames(), buffer.frames());
//! ```

mod phase;
mod stft;

pub use phase::PhaseVocoder;
pub use stft::{FftSize, OverlapAdd, Stft};

use crate::error::{Result, ShiftError};
use capo_library::{AudioBuffer, ChannelData};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Largest supported shift in either direction
pub const MAX_SEMITONES: i32 = 24;

/// Sinc filter length used for the resampling stage
const SINC_LEN: usize = 256;

/// Offline pitch shifter
pub struct PitchShifter {
    vocoder: PhaseVocoder,
}

impl PitchShifter {
    pub fn new(fft_size: FftSize) -> Self {
        Self {
            vocoder: PhaseVocoder::new(fft_size),
        }
    }

    /// Shift every channel of `buffer` by `semitones`
    ///
    /// Stereo channels are processed independently with identical parameters
    /// and truncated to the shorter result.
    pub fn shift(&self, buffer: &AudioBuffer, semitones: i32) -> Result<AudioBuffer> {
        if semitones.abs() > MAX_SEMITONES {
            return Err(ShiftError::OutOfRange(semitones));
        }

        let sample_rate = buffer.sample_rate();
        match buffer.channels() {
            ChannelData::Mono(samples) => Ok(AudioBuffer::mono(
                self.shift_channel(samples, semitones)?,
                sample_rate,
            )),
            ChannelData::Stereo { left, right } => {
                let left = self.shift_channel(left, semitones)?;
                let right = self.shift_channel(right, semitones)?;
                Ok(AudioBuffer::stereo(left, right, sample_rate))
            }
        }
    }

    /// Shift a single channel, keeping its length
    pub fn shift_channel(&self, samples: &[f32], semitones: i32) -> Result<Vec<f32>> {
        if semitones == 0 || samples.is_empty() {
            return Ok(samples.to_vec());
        }

        let factor = 2.0f64.powf(semitones as f64 / 12.0);
        let stretched = self.vocoder.stretch(samples, factor as f32);
        let mut shifted = resample(&stretched, 1.0 / factor)?;

        shifted.resize(samples.len(), 0.0);
        Ok(shifted)
    }
}

impl Default for PitchShifter {
    fn default() -> Self {
        Self::new(FftSize::default())
    }
}

/// Resample by `ratio` (output rate / input rate), delay compensated
fn resample(samples: &[f32], ratio: f64) -> Result<Vec<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // Trailing silence flushes the filter tail
    let mut padded = samples.to_vec();
    padded.resize(samples.len() + 2 * SINC_LEN, 0.0);
    let chunk_len = padded.len();
    let input = vec![padded];

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_len, 1)?;
    let output = resampler.process(&input, None)?;
    let delay = resampler.output_delay();

    let expected = (samples.len() as f64 * ratio).round() as usize;
    Ok(output
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .skip(delay)
        .take(expected)
        .collect())
}

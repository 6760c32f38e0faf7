//! Phase vocoder for offline time-stretching
//!
//! Output frames are read from the analysis frames at fractional positions
//! spaced by the inverse stretch factor. Magnitudes are interpolated between
//! neighbouring frames; phases are accumulated from the measured
//! instantaneous frequency of each bin so partials stay continuous.
//!
//! Only the two analysis frames around the read position are kept; every
//! synthesized frame goes straight into the overlap-add output.

use super::stft::{FftSize, Stft};
use rustfft::num_complex::Complex;
use std::f32::consts::PI;

const TWO_PI: f32 = 2.0 * PI;

/// Offline phase vocoder: changes duration without changing pitch
pub struct PhaseVocoder {
    stft: Stft,
    /// Expected phase advance per bin over one hop
    omega: Vec<f32>,
}

impl PhaseVocoder {
    pub fn new(fft_size: FftSize) -> Self {
        let stft = Stft::new(fft_size);

        // omega[k] = 2 * pi * k * hop_size / fft_size
        let omega: Vec<f32> = (0..stft.num_bins())
            .map(|k| TWO_PI * k as f32 * stft.hop_size() as f32 / stft.size() as f32)
            .collect();

        Self { stft, omega }
    }

    pub fn fft_size(&self) -> usize {
        self.stft.size()
    }

    /// Stretch `samples` to `round(len * factor)` samples
    ///
    /// A factor above 1.0 lengthens the signal.
    pub fn stretch(&self, samples: &[f32], factor: f32) -> Vec<f32> {
        if samples.is_empty() || !(factor > 0.0) {
            return Vec::new();
        }
        if (factor - 1.0).abs() < f32::EPSILON {
            return samples.to_vec();
        }

        let target_len = (samples.len() as f64 * factor as f64).round() as usize;
        let rate = 1.0 / factor as f64;
        let num_frames = self.stft.num_frames(samples.len());
        let num_bins = self.stft.num_bins();
        let zero = Complex::new(0.0f32, 0.0);

        // Analysis frames `held` and `held + 1`; past the end is silence
        let mut current = vec![zero; self.stft.size()];
        let mut next = vec![zero; self.stft.size()];
        let mut held = 0;
        self.load_frame(samples, 0, num_frames, &mut current);
        self.load_frame(samples, 1, num_frames, &mut next);

        let mut phase_accum: Vec<f32> = current[..num_bins].iter().map(|c| c.arg()).collect();
        let mut frame = vec![zero; num_bins];
        let mut ola = self.stft.overlap_add(target_len);

        let mut position = 0.0f64;
        let mut t = 0;
        while position < num_frames as f64 {
            let index = position as usize;
            if index != held {
                if index == held + 1 {
                    std::mem::swap(&mut current, &mut next);
                } else {
                    self.load_frame(samples, index, num_frames, &mut current);
                }
                self.load_frame(samples, index + 1, num_frames, &mut next);
                held = index;
            }

            let alpha = (position - index as f64) as f32;
            for k in 0..num_bins {
                let mag = (1.0 - alpha) * current[k].norm() + alpha * next[k].norm();
                frame[k] = Complex::from_polar(mag, phase_accum[k]);
            }
            ola.add(&frame, t);

            for k in 0..num_bins {
                let deviation = wrap_phase(next[k].arg() - current[k].arg() - self.omega[k]);
                phase_accum[k] = wrap_phase(phase_accum[k] + self.omega[k] + deviation);
            }

            position += rate;
            t += 1;
        }

        ola.finish()
    }

    fn load_frame(
        &self,
        samples: &[f32],
        index: usize,
        num_frames: usize,
        buf: &mut [Complex<f32>],
    ) {
        if index < num_frames {
            self.stft.analyze_frame(samples, index, buf);
        } else {
            buf.fill(Complex::new(0.0, 0.0));
        }
    }
}

/// Wrap phase to [-π, π]
#[inline(always)]
fn wrap_phase(phase: f32) -> f32 {
    phase - TWO_PI * (phase / TWO_PI).round()
}

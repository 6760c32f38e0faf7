//! Frame-at-a-time Short-Time Fourier Transform
//!
//! Frames are centered on multiples of the hop (zero padded at the edges).
//! Analysis produces one spectrum per call and [`OverlapAdd`] accumulates
//! resynthesized frames, so a signal is never held as a whole spectrogram.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// FFT size options for time-stretching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FftSize {
    /// 1024 samples - sharper transients, less frequency resolution
    Small = 1024,
    /// 2048 samples - balanced (recommended)
    #[default]
    Medium = 2048,
    /// 4096 samples - smoother tones, more smearing
    Large = 4096,
}

impl FftSize {
    #[inline]
    pub fn as_usize(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn hop_size(self) -> usize {
        // 75% overlap
        self.as_usize() / 4
    }

    /// Map a configured window length to a size
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            1024 => Some(FftSize::Small),
            2048 => Some(FftSize::Medium),
            4096 => Some(FftSize::Large),
            _ => None,
        }
    }
}

/// Short-Time Fourier Transform processor
pub struct Stft {
    size: usize,
    hop_size: usize,
    /// Periodic Hann window
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(fft_size: FftSize) -> Self {
        let size = fft_size.as_usize();
        let mut planner = FftPlanner::new();

        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect();

        Self {
            size,
            hop_size: fft_size.hop_size(),
            window,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Number of frames covering a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.hop_size
        }
    }

    /// Analyze frame `t` of `signal` into `buf`
    ///
    /// `buf` must hold `size` values; bins `0..=size/2` are valid afterwards.
    pub fn analyze_frame(&self, signal: &[f32], t: usize, buf: &mut [Complex<f32>]) {
        let start = (t * self.hop_size) as isize - (self.size / 2) as isize;
        for (i, slot) in buf.iter_mut().enumerate() {
            let idx = start + i as isize;
            let sample = if idx >= 0 && (idx as usize) < signal.len() {
                signal[idx as usize]
            } else {
                0.0
            };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.forward.process(buf);
    }

    /// Start an overlap-add synthesis of `length` samples
    pub fn overlap_add(&self, length: usize) -> OverlapAdd<'_> {
        OverlapAdd {
            stft: self,
            output: vec![0.0; length],
            window_sum: vec![0.0; length],
            work: vec![Complex::new(0.0, 0.0); self.size],
        }
    }
}

/// Weighted overlap-add of frames produced one at a time
pub struct OverlapAdd<'a> {
    stft: &'a Stft,
    output: Vec<f32>,
    window_sum: Vec<f32>,
    work: Vec<Complex<f32>>,
}

impl OverlapAdd<'_> {
    /// Add the frame at position `t` given its bins `0..=size/2`
    pub fn add(&mut self, bins: &[Complex<f32>], t: usize) {
        let size = self.stft.size;
        let num_bins = self.stft.num_bins();
        let length = self.output.len();
        let norm = 1.0 / size as f32;

        // Rebuild the full Hermitian spectrum
        self.work[..num_bins].copy_from_slice(&bins[..num_bins]);
        for k in 1..size / 2 {
            self.work[size - k] = bins[k].conj();
        }

        self.stft.inverse.process(&mut self.work);

        let start = (t * self.stft.hop_size) as isize - (size / 2) as isize;
        for (i, value) in self.work.iter().enumerate() {
            let idx = start + i as isize;
            if idx < 0 || idx as usize >= length {
                continue;
            }
            let w = self.stft.window[i];
            self.output[idx as usize] += value.re * norm * w;
            self.window_sum[idx as usize] += w * w;
        }
    }

    /// Normalize by the summed squared window
    ///
    /// Positions no frame reached are left at zero.
    pub fn finish(self) -> Vec<f32> {
        let mut output = self.output;
        for (sample, sum) in output.iter_mut().zip(&self.window_sum) {
            if *sum > 1e-8 {
                *sample /= sum;
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_size_from_len() {
        assert_eq!(FftSize::from_len(2048), Some(FftSize::Medium));
        assert_eq!(FftSize::from_len(4096), Some(FftSize::Large));
        assert_eq!(FftSize::from_len(1000), None);
        assert_eq!(FftSize::default().hop_size(), 512);
    }

    #[test]
    fn test_frame_count() {
        let stft = Stft::new(FftSize::Small);
        assert_eq!(stft.num_frames(0), 0);
        assert_eq!(stft.num_frames(1000), 1 + 1000 / 256);
    }

    #[test]
    fn test_perfect_reconstruction() {
        let stft = Stft::new(FftSize::Small);
        let signal: Vec<f32> = (0..8000)
            .map(|i| (i as f32 * 0.05).sin() * 0.5 + (i as f32 * 0.31).cos() * 0.2)
            .collect();

        let mut frame = vec![Complex::new(0.0, 0.0); stft.size()];
        let mut ola = stft.overlap_add(signal.len());
        for t in 0..stft.num_frames(signal.len()) {
            stft.analyze_frame(&signal, t, &mut frame);
            ola.add(&frame[..stft.num_bins()], t);
        }
        let rebuilt = ola.finish();

        assert_eq!(rebuilt.len(), signal.len());
        for (a, b) in signal.iter().zip(&rebuilt) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }
}

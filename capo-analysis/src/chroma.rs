//! Chromagram extraction
//!
//! Computes a 12-bin pitch class energy vector for every hop of a mono
//! signal:
//! 1. Centered, Hann-windowed STFT frames (zero padded at the edges)
//! 2. FFT bins folded into pitch classes, weighted by tuning accuracy
//! 3. Each frame scaled so its strongest bin is 1.0 (silent frames stay 0)

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Reference frequency for A4 (440 Hz)
const A4_FREQ: f32 = 440.0;

/// Hop between chroma frames, in samples
pub const CHROMA_HOP: usize = 512;

/// Window size; large enough to separate semitones in the bass register
const CHROMA_FFT_SIZE: usize = 4096;

/// Frames whose peak energy is below this are treated as silent
const SILENCE_FLOOR: f32 = 1e-10;

/// One chroma vector, index 0 = C
pub type ChromaFrame = [f32; 12];

/// STFT-based chroma analyzer
pub struct ChromaAnalyzer {
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    /// Pre-computed bin-to-pitch-class mapping
    bin_to_pitch_class: Vec<Option<u8>>,
    /// Pre-computed bin weights (tuning accuracy and octave decay)
    bin_weights: Vec<f32>,
    /// Reused per frame
    fft_buffer: Vec<Complex<f32>>,
}

impl ChromaAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        let fft_size = CHROMA_FFT_SIZE;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        let (bin_to_pitch_class, bin_weights) =
            Self::compute_pitch_class_mapping(fft_size, sample_rate);

        Self {
            sample_rate,
            fft_size,
            hop_size: CHROMA_HOP,
            fft,
            window,
            bin_to_pitch_class,
            bin_weights,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Chroma frames per second of audio (not necessarily integral)
    pub fn frames_per_second(&self) -> f64 {
        self.sample_rate as f64 / self.hop_size as f64
    }

    /// Map FFT bins to pitch classes
    ///
    /// Bins outside 55 Hz - 4 kHz are ignored. Weights fall off linearly with
    /// distance from the nearest equal-tempered pitch and by ~3 dB per octave
    /// above 500 Hz.
    fn compute_pitch_class_mapping(
        fft_size: usize,
        sample_rate: u32,
    ) -> (Vec<Option<u8>>, Vec<f32>) {
        let nyquist = sample_rate as f32 / 2.0;
        let bin_freq = |bin: usize| -> f32 { bin as f32 * sample_rate as f32 / fft_size as f32 };

        let min_freq = 55.0; // A1
        let max_freq = 4000.0;

        let mut mapping = Vec::with_capacity(fft_size / 2);
        let mut weights = Vec::with_capacity(fft_size / 2);

        for bin in 0..fft_size / 2 {
            let freq = bin_freq(bin);

            if freq < min_freq || freq > max_freq || freq >= nyquist {
                mapping.push(None);
                weights.push(0.0);
                continue;
            }

            let midi_note = 12.0 * (freq / A4_FREQ).log2() + 69.0;
            let exact_note = midi_note.round();
            let pitch_class = ((exact_note as i32 % 12 + 12) % 12) as u8;

            let detune = (midi_note - exact_note).abs();
            let tuning_weight = 1.0 - detune.min(0.5) * 2.0;
            let octave_decay = (500.0 / freq.max(500.0)).sqrt();

            mapping.push(Some(pitch_class));
            weights.push(tuning_weight.max(0.0) * octave_decay);
        }

        (mapping, weights)
    }

    /// Compute the chromagram of a mono signal
    ///
    /// Frame `t` is centered on sample `t * hop`, so a signal of `n` samples
    /// yields `1 + n / hop` frames. An empty signal yields none.
    pub fn chromagram(&mut self, mono: &[f32]) -> Vec<ChromaFrame> {
        if mono.is_empty() {
            return Vec::new();
        }

        let num_frames = 1 + mono.len() / self.hop_size;
        let half = (self.fft_size / 2) as isize;

        (0..num_frames)
            .map(|t| {
                let start = (t * self.hop_size) as isize - half;
                self.analyze_frame(mono, start)
            })
            .collect()
    }

    /// Analyze the frame beginning at `start` (may lie outside the signal)
    fn analyze_frame(&mut self, mono: &[f32], start: isize) -> ChromaFrame {
        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let idx = start + i as isize;
            let sample = if idx >= 0 && (idx as usize) < mono.len() {
                mono[idx as usize]
            } else {
                0.0
            };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let mut chroma = [0.0f32; 12];
        for (bin, value) in self.fft_buffer[..self.fft_size / 2].iter().enumerate() {
            if let Some(pitch_class) = self.bin_to_pitch_class[bin] {
                chroma[pitch_class as usize] += value.norm_sqr() * self.bin_weights[bin];
            }
        }

        let peak = chroma.iter().cloned().fold(0.0f32, f32::max);
        if peak > SILENCE_FLOOR {
            for v in &mut chroma {
                *v /= peak;
            }
        } else {
            chroma = [0.0; 12];
        }

        chroma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        (0..(sample_rate as f32 * secs) as usize)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_analyzer_creation() {
        let analyzer = ChromaAnalyzer::new(44100);
        assert_eq!(analyzer.hop_size(), 512);
        assert_relative_eq!(analyzer.frames_per_second(), 86.1328125);
    }

    #[test]
    fn test_pitch_class_mapping() {
        let analyzer = ChromaAnalyzer::new(44100);
        assert!(analyzer.bin_to_pitch_class.iter().any(|pc| pc.is_some()));
        // DC and sub-bass bins are ignored
        assert_eq!(analyzer.bin_to_pitch_class[0], None);
        assert_eq!(analyzer.bin_weights[1], 0.0);
    }

    #[test]
    fn test_frame_count() {
        let mut analyzer = ChromaAnalyzer::new(22050);
        assert!(analyzer.chromagram(&[]).is_empty());
        assert_eq!(analyzer.chromagram(&vec![0.0; 22050]).len(), 1 + 22050 / 512);
        assert_eq!(analyzer.chromagram(&[0.1]).len(), 1);
    }

    #[test]
    fn test_silence_is_all_zero() {
        let mut analyzer = ChromaAnalyzer::new(44100);
        let frames = analyzer.chromagram(&vec![0.0; 44100]);
        assert!(frames.iter().all(|f| f.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn test_a440_peaks_at_a() {
        let mut analyzer = ChromaAnalyzer::new(44100);
        let frames = analyzer.chromagram(&sine(440.0, 44100, 1.0));

        let mid = &frames[frames.len() / 2];
        assert_eq!(mid[9], 1.0, "A should be the strongest pitch class: {mid:?}");
    }
}

//! Tempo estimation from an onset-strength envelope
//!
//! 1. Log-compressed spectral flux gives an onset envelope (one value per hop)
//! 2. Autocorrelation of the envelope, weighted by a log-normal prior around
//!    120 BPM, picks the dominant beat period
//! 3. A dynamic-programming beat tracker lays beats on the envelope at that
//!    period; the median inter-beat interval gives the reported tempo

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Center of the tempo prior
const PRIOR_BPM: f32 = 120.0;
/// Width of the tempo prior in octaves
const PRIOR_STD_OCTAVES: f32 = 1.0;
/// Range of tempi considered
const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;
/// How strongly the beat tracker sticks to the estimated period
const TIGHTNESS: f32 = 100.0;

/// Result of beat tracking
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    /// Dominant tempo
    pub bpm: f32,
    /// Beat positions in seconds
    pub beats: Vec<f64>,
}

/// Onset-envelope tempo estimator
pub struct TempoEstimator {
    sample_rate: u32,
    hop_size: usize,
    fft_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
}

impl TempoEstimator {
    pub fn new(sample_rate: u32) -> Self {
        let fft_size = 2048;
        let hop_size = 512; // ~11.6ms at 44.1kHz - good for transient detection
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        Self {
            sample_rate,
            hop_size,
            fft_size,
            fft,
            window,
        }
    }

    fn frames_per_second(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Estimate the tempo of a mono signal
    ///
    /// Returns 0.0 for empty, silent, or too-short input.
    pub fn estimate(&self, mono: &[f32]) -> f32 {
        self.track_beats(mono).map(|t| t.bpm).unwrap_or(0.0)
    }

    /// Estimate tempo and beat positions
    pub fn track_beats(&self, mono: &[f32]) -> Option<BeatTrack> {
        if mono.is_empty() || self.sample_rate == 0 {
            return None;
        }

        let onset = self.onset_envelope(mono);
        let peak = onset.iter().cloned().fold(0.0f32, f32::max);
        if peak <= f32::EPSILON {
            tracing::debug!("onset envelope is flat, tempo unknown");
            return None;
        }

        let period = self.estimate_period(&onset)?;
        let fps = self.frames_per_second();
        let beats = self.track(&onset, period);

        let bpm = median_interval(&beats)
            .map(|frames| 60.0 * fps / frames)
            .unwrap_or(60.0 * fps / period);

        Some(BeatTrack {
            bpm,
            beats: beats
                .into_iter()
                .map(|f| f as f64 / fps as f64)
                .collect(),
        })
    }

    /// Onset strength: positive change of the log-magnitude spectrum
    ///
    /// Frames are centered on multiples of the hop, so the envelope has
    /// `1 + n / hop` entries with entry 0 fixed at zero.
    pub fn onset_envelope(&self, mono: &[f32]) -> Vec<f32> {
        if mono.is_empty() {
            return Vec::new();
        }

        let num_frames = 1 + mono.len() / self.hop_size;
        let half = (self.fft_size / 2) as isize;
        let bins = self.fft_size / 2;

        let mut onset_fn = Vec::with_capacity(num_frames);
        let mut prev_spectrum: Option<Vec<f32>> = None;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];

        for t in 0..num_frames {
            let start = (t * self.hop_size) as isize - half;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && (idx as usize) < mono.len() {
                    mono[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut buffer);

            let spectrum: Vec<f32> = buffer[..bins]
                .iter()
                .map(|c| (1.0 + 100.0 * c.norm()).ln())
                .collect();

            // Half-wave rectified difference: only increases mark onsets
            let flux = match prev_spectrum {
                Some(ref prev) => {
                    spectrum
                        .iter()
                        .zip(prev.iter())
                        .map(|(curr, prev)| (curr - prev).max(0.0))
                        .sum::<f32>()
                        / bins as f32
                }
                None => 0.0,
            };
            onset_fn.push(flux);
            prev_spectrum = Some(spectrum);
        }

        onset_fn
    }

    /// Beat period in envelope frames
    ///
    /// Autocorrelation over lags covering 30-300 BPM, weighted by the tempo
    /// prior.
    fn estimate_period(&self, onset: &[f32]) -> Option<f32> {
        let fps = self.frames_per_second();
        let min_lag = ((60.0 * fps / MAX_BPM).ceil() as usize).max(1);
        let max_lag = ((60.0 * fps / MIN_BPM) as usize).min(onset.len().saturating_sub(1));
        if min_lag > max_lag {
            return None;
        }

        let mean = onset.iter().sum::<f32>() / onset.len() as f32;
        let centered: Vec<f32> = onset.iter().map(|v| v - mean).collect();

        let mut best_lag = None;
        let mut best_score = 0.0f32;

        for lag in min_lag..=max_lag {
            let correlation: f32 = centered[..centered.len() - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum();

            let bpm = 60.0 * fps / lag as f32;
            let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_STD_OCTAVES;
            let score = correlation * (-0.5 * octaves * octaves).exp();

            if score > best_score {
                best_score = score;
                best_lag = Some(lag);
            }
        }

        best_lag.map(|lag| lag as f32)
    }

    /// Dynamic-programming beat tracker
    ///
    /// Every frame scores its onset strength plus the best predecessor
    /// between half and twice a period back, penalised by the squared log
    /// ratio of the gap to the period.
    fn track(&self, onset: &[f32], period: f32) -> Vec<usize> {
        let n = onset.len();

        // Normalise by standard deviation
        let mean = onset.iter().sum::<f32>() / n as f32;
        let std_dev = (onset.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32).sqrt();
        let norm: Vec<f32> = if std_dev > 0.0 {
            onset.iter().map(|v| v / std_dev).collect()
        } else {
            onset.to_vec()
        };

        // Smooth with a Gaussian a fraction of a beat wide
        let radius = period.round() as isize;
        let kernel: Vec<f32> = (-radius..=radius)
            .map(|k| (-0.5 * (k as f32 * 32.0 / period).powi(2)).exp())
            .collect();
        let local_score: Vec<f32> = (0..n as isize)
            .map(|i| {
                kernel
                    .iter()
                    .enumerate()
                    .filter_map(|(j, w)| {
                        let idx = i + j as isize - radius;
                        (idx >= 0 && (idx as usize) < n).then(|| w * norm[idx as usize])
                    })
                    .sum::<f32>()
            })
            .collect();

        let min_gap = (period / 2.0).round().max(1.0) as usize;
        let max_gap = (period * 2.0).round() as usize;

        let mut cumulative = vec![0.0f32; n];
        let mut backlink: Vec<Option<usize>> = vec![None; n];

        for i in 0..n {
            let mut best: Option<(usize, f32)> = None;
            if i >= min_gap {
                let lo = i.saturating_sub(max_gap);
                for prev in lo..=(i - min_gap) {
                    let gap = (i - prev) as f32;
                    let penalty = -TIGHTNESS * (gap / period).ln().powi(2);
                    let score = cumulative[prev] + penalty;
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((prev, score));
                    }
                }
            }

            match best {
                Some((prev, score)) if score > 0.0 => {
                    cumulative[i] = local_score[i] + score;
                    backlink[i] = Some(prev);
                }
                _ => cumulative[i] = local_score[i],
            }
        }

        // Last beat: the final local maximum of the cumulative score that is
        // at least half the median of all such maxima
        let maxima: Vec<usize> = (1..n.saturating_sub(1))
            .filter(|&i| cumulative[i] > cumulative[i - 1] && cumulative[i] >= cumulative[i + 1])
            .collect();
        if maxima.is_empty() {
            return Vec::new();
        }

        let mut peak_scores: Vec<f32> = maxima.iter().map(|&i| cumulative[i]).collect();
        peak_scores.sort_by(|a, b| a.total_cmp(b));
        let threshold = 0.5 * peak_scores[peak_scores.len() / 2];

        let Some(&last) = maxima.iter().rev().find(|&&i| cumulative[i] >= threshold) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        let mut cursor = last;
        while let Some(prev) = backlink[cursor] {
            beats.push(prev);
            cursor = prev;
        }
        beats.reverse();
        beats
    }
}

/// Median gap between consecutive beats, in frames
fn median_interval(beats: &[usize]) -> Option<f32> {
    if beats.len() < 3 {
        return None;
    }

    let mut gaps: Vec<usize> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.sort_unstable();
    let mid = gaps.len() / 2;

    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) as f32 / 2.0
    } else {
        gaps[mid] as f32
    };

    (median > 0.0).then_some(median)
}

//! In-memory sample storage for a loaded track

use std::borrow::Cow;

/// Channel layout of a decoded track, kept exactly as the file stores it
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Mono(Vec<f32>),
    Stereo { left: Vec<f32>, right: Vec<f32> },
}

/// Decoded audio at its native sample rate
///
/// Stereo channels always hold the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: ChannelData,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a mono buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            channels: ChannelData::Mono(samples),
            sample_rate,
        }
    }

    /// Create a stereo buffer, truncating both channels to the shorter one
    pub fn stereo(mut left: Vec<f32>, mut right: Vec<f32>, sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        if left.len() != right.len() {
            tracing::debug!(
                left = left.len(),
                right = right.len(),
                "truncating stereo channels to {frames} frames"
            );
        }
        left.truncate(frames);
        right.truncate(frames);

        Self {
            channels: ChannelData::Stereo { left, right },
            sample_rate,
        }
    }

    /// Build a buffer from interleaved samples
    ///
    /// Mono stays mono; anything with two or more channels keeps the first two.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        match channels {
            0 | 1 => Self::mono(samples.to_vec(), sample_rate),
            n => {
                let frames = samples.len() / n;
                let mut left = Vec::with_capacity(frames);
                let mut right = Vec::with_capacity(frames);
                for frame in samples.chunks_exact(n) {
                    left.push(frame[0]);
                    right.push(frame[1]);
                }
                Self::stereo(left, right, sample_rate)
            }
        }
    }

    pub fn channels(&self) -> &ChannelData {
        &self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels (1 or 2)
    pub fn channel_count(&self) -> u16 {
        match self.channels {
            ChannelData::Mono(_) => 1,
            ChannelData::Stereo { .. } => 2,
        }
    }

    pub fn is_stereo(&self) -> bool {
        matches!(self.channels, ChannelData::Stereo { .. })
    }

    /// Number of sample frames per channel
    pub fn frames(&self) -> usize {
        match &self.channels {
            ChannelData::Mono(samples) => samples.len(),
            ChannelData::Stereo { left, .. } => left.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Channel-averaged copy for analysis (borrowed when already mono)
    pub fn to_mono(&self) -> Cow<'_, [f32]> {
        match &self.channels {
            ChannelData::Mono(samples) => Cow::Borrowed(samples),
            ChannelData::Stereo { left, right } => Cow::Owned(
                left.iter()
                    .zip(right)
                    .map(|(l, r)| (l + r) * 0.5)
                    .collect(),
            ),
        }
    }

    /// Interleaved samples ([L, R, L, R, ...] for stereo)
    pub fn interleaved(&self) -> Vec<f32> {
        match &self.channels {
            ChannelData::Mono(samples) => samples.clone(),
            ChannelData::Stereo { left, right } => {
                let mut out = Vec::with_capacity(left.len() * 2);
                for (l, r) in left.iter().zip(right) {
                    out.push(*l);
                    out.push(*r);
                }
                out
            }
        }
    }

    /// Downsampled absolute peaks for waveform display
    pub fn waveform_overview(&self, target_points: usize) -> Vec<f32> {
        if target_points == 0 {
            return Vec::new();
        }

        let mono = self.to_mono();
        if mono.is_empty() {
            return vec![0.0; target_points];
        }

        let chunk_size = (mono.len() / target_points).max(1);

        mono.chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|s| s.abs()).fold(0.0f32, f32::max))
            .collect()
    }
}

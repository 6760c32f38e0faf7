//! Temporary pitch-shifted renders
//!
//! A `RenderedTrack` owns the WAV file it wrote. The file is removed when the
//! track is disposed or dropped.

use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;

use capo_library::{AudioBuffer, ChannelData};
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempPath;

use crate::error::Result;

/// Filename prefix of every render
pub const RENDER_PREFIX: &str = "capo_shift_";

/// A shifted copy of the loaded track on disk
#[derive(Debug)]
pub struct RenderedTrack {
    semitones: i32,
    path: TempPath,
}

impl RenderedTrack {
    /// Write `buffer` as 16-bit PCM WAV under a fresh name in `dir`
    pub fn write(buffer: &AudioBuffer, semitones: i32, dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{RENDER_PREFIX}{semitones:+}_"))
            .suffix(".wav")
            .tempfile_in(dir)?;
        let (file, path) = file.into_parts();

        let spec = WavSpec {
            channels: buffer.channel_count(),
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::new(BufWriter::new(file), spec)?;
        write_samples(&mut writer, buffer)?;
        writer.finalize()?;

        tracing::info!(
            "Rendered {:+} semitones to {} ({} frames)",
            semitones,
            path.display(),
            buffer.frames()
        );

        Ok(Self { semitones, path })
    }

    pub fn semitones(&self) -> i32 {
        self.semitones
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now
    ///
    /// A file that is already gone is fine; any other failure is logged.
    pub fn dispose(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => tracing::debug!("Removed render {}", shown),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Render {} was already removed", shown)
            }
            Err(e) => tracing::warn!("Could not remove render {}: {}", shown, e),
        }
    }
}

fn write_samples<W: Write + Seek>(writer: &mut WavWriter<W>, buffer: &AudioBuffer) -> Result<()> {
    match buffer.channels() {
        ChannelData::Mono(samples) => {
            for &s in samples {
                writer.write_sample(float_to_i16(s))?;
            }
        }
        ChannelData::Stereo { left, right } => {
            for (&l, &r) in left.iter().zip(right) {
                writer.write_sample(float_to_i16(l))?;
                writer.write_sample(float_to_i16(r))?;
            }
        }
    }
    Ok(())
}

#[inline]
fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renders_in(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(RENDER_PREFIX))
            .count()
    }

    #[test]
    fn test_float_to_i16() {
        assert_eq!(float_to_i16(0.0), 0);
        assert_eq!(float_to_i16(1.0), i16::MAX);
        assert_eq!(float_to_i16(2.0), i16::MAX);
        assert_eq!(float_to_i16(-1.0), -i16::MAX);
    }

    #[test]
    fn test_write_and_dispose() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = AudioBuffer::stereo(vec![0.5; 1000], vec![-0.5; 1000], 48000);

        let render = RenderedTrack::write(&buffer, -3, dir.path()).unwrap();
        assert_eq!(render.semitones(), -3);
        assert!(render.path().exists());
        assert!(render
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("capo_shift_-3_"));

        let reader = hound::WavReader::open(render.path()).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 1000);

        let path = render.path().to_path_buf();
        render.dispose();
        assert!(!path.exists());
        assert_eq!(renders_in(dir.path()), 0);
    }

    #[test]
    fn test_dispose_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = AudioBuffer::mono(vec![0.1; 10], 22050);
        let render = RenderedTrack::write(&buffer, 1, dir.path()).unwrap();

        std::fs::remove_file(render.path()).unwrap();
        render.dispose();
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = AudioBuffer::mono(vec![0.1; 10], 22050);
        {
            let _render = RenderedTrack::write(&buffer, 5, dir.path()).unwrap();
            assert_eq!(renders_in(dir.path()), 1);
        }
        assert_eq!(renders_in(dir.path()), 0);
    }
}

//! Audio file loading and decoding

use crate::buffer::AudioBuffer;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("File decoded to zero samples")]
    Empty,
}

/// Track metadata
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A loaded and decoded audio track
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    /// Path the track was read from
    pub path: PathBuf,
    /// Decoded samples at the file's native rate
    pub buffer: AudioBuffer,
    /// Track metadata
    pub metadata: TrackMetadata,
}

/// Audio file loader using Symphonia
///
/// Never resamples: the buffer keeps the rate the decoder reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackLoader;

impl TrackLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<LoadedTrack, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        tracing::info!("Loading {}", path.display());

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::UnsupportedFormat(e.to_string()))?;

        let mut metadata = self.extract_metadata(&mut format, path);

        // Rate and layout as declared; corrected by the first decoded packet
        let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
        let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    tracing::debug!("skipping corrupt packet: {msg}");
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count();

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() || sample_rate == 0 || channels == 0 {
            return Err(LoadError::Empty);
        }

        if channels > 2 {
            tracing::warn!("{channels}-channel file, keeping the first two channels");
        }

        let buffer = AudioBuffer::from_interleaved(&samples, channels, sample_rate);

        metadata.sample_rate = sample_rate;
        metadata.channels = buffer.channel_count();
        metadata.duration_secs = buffer.duration_secs();

        tracing::info!(
            sample_rate,
            channels = metadata.channels,
            "Loaded {} ({:.2}s)",
            metadata.title,
            metadata.duration_secs
        );

        Ok(LoadedTrack {
            path: path.to_path_buf(),
            buffer,
            metadata,
        })
    }

    /// Extract metadata from format reader
    fn extract_metadata(&self, format: &mut Box<dyn FormatReader>, path: &Path) -> TrackMetadata {
        let mut metadata = TrackMetadata {
            title: path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string(),
            artist: "Unknown".to_string(),
            album: "Unknown".to_string(),
            ..Default::default()
        };

        if let Some(meta) = format.metadata().current() {
            for tag in meta.tags() {
                match tag.std_key {
                    Some(StandardTagKey::TrackTitle) => metadata.title = tag.value.to_string(),
                    Some(StandardTagKey::Artist) => metadata.artist = tag.value.to_string(),
                    Some(StandardTagKey::Album) => metadata.album = tag.value.to_string(),
                    _ => {}
                }
            }
        }

        metadata
    }
}

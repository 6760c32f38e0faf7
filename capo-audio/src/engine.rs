//! Engine facade - owns the loaded track, its analysis and the live render

use std::path::{Path, PathBuf};

use capo_analysis::{AnalysisResult, ChordLabel};
use capo_library::{Config, LoadError, LoadedTrack, TrackLoader};

use crate::error::{EngineError, ShiftError};
use crate::render::RenderedTrack;
use crate::timestretcher::{FftSize, PitchShifter, MAX_SEMITONES};

/// Lifecycle of the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing loaded
    Empty,
    /// Track decoded, not analyzed yet
    Loaded,
    /// Tempo and chords available
    Analyzed,
}

/// Which audio the player should be pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyShift {
    #[default]
    Original,
    Shifted(i32),
}

impl KeyShift {
    pub fn semitones(self) -> i32 {
        match self {
            KeyShift::Original => 0,
            KeyShift::Shifted(n) => n,
        }
    }
}

/// A decoded track together with its analysis
#[derive(Debug, Clone)]
pub struct AnalyzedTrack {
    pub track: LoadedTrack,
    pub analysis: AnalysisResult,
}

impl AnalyzedTrack {
    /// Run tempo and chord estimation on a decoded track
    pub fn analyze(track: LoadedTrack) -> Self {
        let mono = track.buffer.to_mono();
        let analysis = capo_analysis::analyze(&mono, track.buffer.sample_rate());
        drop(mono);
        Self { track, analysis }
    }
}

/// Facade over loading, analysis and pitch-shift rendering
pub struct Engine {
    loader: TrackLoader,
    shifter: PitchShifter,
    render_dir: PathBuf,
    track: Option<LoadedTrack>,
    analysis: Option<AnalysisResult>,
    render: Option<RenderedTrack>,
}

impl Engine {
    /// Create an engine writing renders into `render_dir`
    pub fn new(render_dir: impl Into<PathBuf>, fft_size: FftSize) -> Self {
        Self {
            loader: TrackLoader::new(),
            shifter: PitchShifter::new(fft_size),
            render_dir: render_dir.into(),
            track: None,
            analysis: None,
            render: None,
        }
    }

    /// Create an engine from user configuration
    pub fn from_config(config: &Config) -> Self {
        let fft_size = FftSize::from_len(config.fft_size).unwrap_or_default();
        Self::new(config.render_dir(), fft_size)
    }

    pub fn state(&self) -> EngineState {
        match (&self.track, &self.analysis) {
            (None, _) => EngineState::Empty,
            (Some(_), None) => EngineState::Loaded,
            (Some(_), Some(_)) => EngineState::Analyzed,
        }
    }

    pub fn key_shift(&self) -> KeyShift {
        match &self.render {
            Some(render) => KeyShift::Shifted(render.semitones()),
            None => KeyShift::Original,
        }
    }

    pub fn render_dir(&self) -> &Path {
        &self.render_dir
    }

    pub fn track(&self) -> Option<&LoadedTrack> {
        self.track.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// File the player should currently play
    pub fn source_path(&self) -> Option<&Path> {
        match &self.render {
            Some(render) => Some(render.path()),
            None => self.track.as_ref().map(|t| t.path.as_path()),
        }
    }

    /// Decode a file, replacing the current track
    ///
    /// On failure the previous track and analysis are kept but any render is
    /// released.
    pub fn load(&mut self, path: &Path) -> Result<(), LoadError> {
        self.cleanup();

        let track = self.loader.load(path)?;
        self.track = Some(track);
        self.analysis = None;
        Ok(())
    }

    /// Analyze the loaded track, once per load
    pub fn analyze(&mut self) -> Result<&AnalysisResult, EngineError> {
        if self.analysis.is_none() {
            let track = self.track.as_ref().ok_or(EngineError::NoTrack)?;
            let mono = track.buffer.to_mono();
            let result = capo_analysis::analyze(&mono, track.buffer.sample_rate());
            self.analysis = Some(result);
        }

        self.analysis.as_ref().ok_or(EngineError::NoTrack)
    }

    /// Adopt a track analyzed elsewhere (e.g. by the background worker)
    pub fn install(&mut self, analyzed: AnalyzedTrack) {
        self.cleanup();

        tracing::info!(
            "Installed {} ({:.1} BPM, {} chord seconds)",
            analyzed.track.path.display(),
            analyzed.analysis.tempo_bpm,
            analyzed.analysis.chords.len()
        );

        self.track = Some(analyzed.track);
        self.analysis = Some(analyzed.analysis);
    }

    /// Estimated tempo, 0.0 when unknown
    pub fn tempo(&self) -> f32 {
        self.analysis.as_ref().map_or(0.0, |a| a.tempo_bpm)
    }

    /// Per-second chords in the original key
    pub fn chords(&self) -> &[ChordLabel] {
        self.analysis
            .as_ref()
            .map(|a| a.chords.as_slice())
            .unwrap_or(&[])
    }

    /// Point at audio shifted by `semitones` and return its path
    ///
    /// Zero releases any render and returns the original file. Otherwise the
    /// shifted audio is computed, the previous render is released and the new
    /// one written. If the shift itself fails nothing changes; if writing
    /// fails the engine is back on the original file.
    pub fn shift(&mut self, semitones: i32) -> Result<PathBuf, ShiftError> {
        let track = self.track.as_ref().ok_or(ShiftError::NoTrack)?;

        if semitones == 0 {
            let original = track.path.clone();
            self.cleanup();
            return Ok(original);
        }

        if semitones.abs() > MAX_SEMITONES {
            return Err(ShiftError::OutOfRange(semitones));
        }

        if let Some(render) = &self.render {
            if render.semitones() == semitones && render.path().exists() {
                return Ok(render.path().to_path_buf());
            }
        }

        tracing::info!("Shifting {} by {:+} semitones", track.path.display(), semitones);
        let shifted = self.shifter.shift(&track.buffer, semitones)?;

        self.cleanup();
        let render = RenderedTrack::write(&shifted, semitones, &self.render_dir)?;
        let path = render.path().to_path_buf();
        self.render = Some(render);

        Ok(path)
    }

    /// Release the live render, if any
    ///
    /// Leaves the track and analysis untouched.
    pub fn cleanup(&mut self) {
        if let Some(render) = self.render.take() {
            render.dispose();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

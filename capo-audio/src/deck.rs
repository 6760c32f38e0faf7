//! Practice deck - drives an external player from the engine and the
//! key/capo/tempo controls

use std::path::{Path, PathBuf};

use capo_analysis::{
    chord_at, display_label, display_offset, shape_for_label, ChordMode, FretPosition,
};

use crate::engine::{AnalyzedTrack, Engine};
use crate::error::{EngineError, ShiftError};

/// Lowest playback-rate multiplier
pub const MIN_PLAYBACK_RATE: f32 = 0.2;
/// Highest playback-rate multiplier
pub const MAX_PLAYBACK_RATE: f32 = 2.0;
/// Highest capo fret
pub const MAX_CAPO: u8 = 11;

/// Audio output the deck controls
///
/// Implemented by whatever actually plays files (a media framework, a test
/// double). Positions and durations are in milliseconds.
pub trait PlaybackService {
    fn set_source(&mut self, path: &Path);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn position_ms(&self) -> u64;
    fn duration_ms(&self) -> u64;
    fn seek_ms(&mut self, position_ms: u64);
    /// Speed multiplier, pitch preserved by the player
    fn set_playback_rate(&mut self, rate: f32);
}

/// Snapshot for UI rendering
#[derive(Debug, Clone, PartialEq)]
pub struct DeckState {
    pub key_shift: i32,
    pub capo: u8,
    pub playback_rate: f32,
    pub bpm: f32,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub is_playing: bool,
    /// Chord under the playhead, transposed for display
    pub chord: Option<String>,
    pub chord_mode: ChordMode,
    /// Fingering of `chord`; empty without a chord
    pub shape: &'static [FretPosition],
}

/// Practice session over one engine and one player
pub struct PracticeDeck<P: PlaybackService> {
    engine: Engine,
    player: P,
    key_shift: i32,
    capo: u8,
    default_capo: u8,
    playback_rate: f32,
    chord_mode: ChordMode,
    source: Option<PathBuf>,
}

impl<P: PlaybackService> PracticeDeck<P> {
    pub fn new(engine: Engine, player: P) -> Self {
        Self {
            engine,
            player,
            key_shift: 0,
            capo: 0,
            default_capo: 0,
            playback_rate: 1.0,
            chord_mode: ChordMode::default(),
            source: None,
        }
    }

    /// Capo position applied whenever a track is opened
    pub fn with_default_capo(mut self, capo: u8) -> Self {
        self.default_capo = capo.min(MAX_CAPO);
        self.capo = self.default_capo;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Adopt an analyzed track and point the player at the original file
    pub fn open(&mut self, track: AnalyzedTrack) {
        self.engine.install(track);
        self.reset_for_track();
    }

    /// Load and analyze on the calling thread, then open
    pub fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.engine.load(path)?;
        self.engine.analyze()?;
        self.reset_for_track();
        Ok(())
    }

    fn reset_for_track(&mut self) {
        self.key_shift = 0;
        self.capo = self.default_capo;
        self.playback_rate = 1.0;

        self.player.stop();
        self.source = self.engine.source_path().map(Path::to_path_buf);
        if let Some(source) = &self.source {
            self.player.set_source(source);
        }
        self.player.set_playback_rate(self.playback_rate);
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        self.playback_rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        self.player.set_playback_rate(self.playback_rate);
    }

    /// Move the effective tempo by `delta_bpm`
    ///
    /// Does nothing when the track's tempo is unknown.
    pub fn change_speed(&mut self, delta_bpm: f32) {
        let original = self.engine.tempo();
        if original <= 0.0 {
            return;
        }
        let target = original * self.playback_rate + delta_bpm;
        self.set_playback_rate(target / original);
    }

    pub fn original_bpm(&self) -> f32 {
        self.engine.tempo()
    }

    /// Tempo heard at the current playback rate
    pub fn current_bpm(&self) -> f32 {
        self.engine.tempo() * self.playback_rate
    }

    pub fn key_shift(&self) -> i32 {
        self.key_shift
    }

    pub fn key_up(&mut self) -> Result<(), ShiftError> {
        self.set_key_shift(self.key_shift + 1)
    }

    pub fn key_down(&mut self) -> Result<(), ShiftError> {
        self.set_key_shift(self.key_shift - 1)
    }

    /// Render (or revert) the audio for a key shift and swap it into the
    /// player, keeping position, rate and play state
    pub fn set_key_shift(&mut self, semitones: i32) -> Result<(), ShiftError> {
        match self.engine.shift(semitones) {
            Ok(path) => {
                self.key_shift = semitones;
                self.swap_source(path);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Key shift to {:+} failed: {}", semitones, e);
                // The engine may have fallen back to the original file
                self.key_shift = self.engine.key_shift().semitones();
                if let Some(path) = self.engine.source_path().map(Path::to_path_buf) {
                    if self.source.as_deref() != Some(path.as_path()) {
                        self.swap_source(path);
                    }
                }
                Err(e)
            }
        }
    }

    fn swap_source(&mut self, path: PathBuf) {
        let position = self.player.position_ms();
        let was_playing = self.player.is_playing();

        self.player.stop();
        self.player.set_source(&path);
        self.player.set_playback_rate(self.playback_rate);
        self.player.seek_ms(position);
        if was_playing {
            self.player.play();
        }

        self.source = Some(path);
    }

    pub fn capo(&self) -> u8 {
        self.capo
    }

    pub fn capo_up(&mut self) {
        self.capo = (self.capo + 1).min(MAX_CAPO);
    }

    pub fn capo_down(&mut self) {
        self.capo = self.capo.saturating_sub(1);
    }

    pub fn display_offset(&self) -> i32 {
        display_offset(self.key_shift, self.capo)
    }

    /// Whole chord sequence as it should be shown
    pub fn display_chords(&self) -> Vec<String> {
        let offset = self.display_offset();
        self.engine
            .chords()
            .iter()
            .map(|label| display_label(&label.to_string(), offset))
            .collect()
    }

    /// Chord under the playhead
    pub fn current_chord(&self) -> Option<String> {
        let label = chord_at(self.engine.chords(), self.position_secs())?;
        Some(display_label(&label.to_string(), self.display_offset()))
    }

    pub fn chord_mode(&self) -> ChordMode {
        self.chord_mode
    }

    /// Choose open or barre fingerings; kept across tracks
    pub fn set_chord_mode(&mut self, mode: ChordMode) {
        self.chord_mode = mode;
    }

    /// Fingering of the chord under the playhead
    pub fn current_shape(&self) -> &'static [FretPosition] {
        match self.current_chord() {
            Some(chord) => shape_for_label(&chord, self.chord_mode),
            None => &[],
        }
    }

    pub fn play(&mut self) {
        self.player.play();
    }

    pub fn pause(&mut self) {
        self.player.pause();
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn position_secs(&self) -> f64 {
        self.player.position_ms() as f64 / 1000.0
    }

    pub fn seek_seconds(&mut self, seconds: f64) {
        let mut target = (seconds.max(0.0) * 1000.0) as u64;
        let duration = self.player.duration_ms();
        if duration > 0 {
            target = target.min(duration);
        }
        self.player.seek_ms(target);
    }

    /// Move the playhead by `delta_secs`, clamped to the track
    pub fn nudge(&mut self, delta_secs: f64) {
        let duration = self.player.duration_ms();
        if duration == 0 {
            return;
        }
        let target = self.player.position_ms() as i64 + (delta_secs * 1000.0) as i64;
        self.player.seek_ms(target.clamp(0, duration as i64) as u64);
    }

    pub fn state(&self) -> DeckState {
        let chord = self.current_chord();
        let shape: &'static [FretPosition] = match &chord {
            Some(chord) => shape_for_label(chord, self.chord_mode),
            None => &[],
        };
        DeckState {
            key_shift: self.key_shift,
            capo: self.capo,
            playback_rate: self.playback_rate,
            bpm: self.current_bpm(),
            position_secs: self.position_secs(),
            duration_secs: self.player.duration_ms() as f64 / 1000.0,
            is_playing: self.player.is_playing(),
            chord,
            chord_mode: self.chord_mode,
            shape,
        }
    }

    /// Stop playback, release the render and leave the player on the
    /// original file
    pub fn close(&mut self) {
        self.player.stop();
        self.engine.cleanup();
        self.key_shift = 0;

        let original = self.engine.source_path().map(Path::to_path_buf);
        if let Some(path) = &original {
            if self.source.as_ref() != Some(path) {
                self.player.set_source(path);
            }
        }
        self.source = original;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestretcher::FftSize;
    use capo_analysis::{AnalysisResult, ChordLabel, PitchClass};
    use capo_library::{AudioBuffer, LoadedTrack};

    #[derive(Default)]
    struct FakePlayer {
        source: Option<PathBuf>,
        playing: bool,
        position: u64,
        duration: u64,
        rate: f32,
        sources_set: usize,
    }

    impl PlaybackService for FakePlayer {
        fn set_source(&mut self, path: &Path) {
            self.source = Some(path.to_path_buf());
            self.position = 0;
            self.sources_set += 1;
        }
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn stop(&mut self) {
            self.playing = false;
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn position_ms(&self) -> u64 {
            self.position
        }
        fn duration_ms(&self) -> u64 {
            self.duration
        }
        fn seek_ms(&mut self, position_ms: u64) {
            self.position = position_ms;
        }
        fn set_playback_rate(&mut self, rate: f32) {
            self.rate = rate;
        }
    }

    fn sine_track(path: &Path, tempo: f32) -> AnalyzedTrack {
        let samples: Vec<f32> = (0..22050 * 3)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 22050.0).sin() * 0.4)
            .collect();
        AnalyzedTrack {
            track: LoadedTrack {
                path: path.to_path_buf(),
                buffer: AudioBuffer::mono(samples, 22050),
                metadata: Default::default(),
            },
            analysis: AnalysisResult {
                tempo_bpm: tempo,
                chords: vec![
                    ChordLabel::Major(PitchClass::new(0)),
                    ChordLabel::Major(PitchClass::new(7)),
                    ChordLabel::NoChord,
                ],
            },
        }
    }

    fn deck(dir: &Path, tempo: f32) -> PracticeDeck<FakePlayer> {
        let player = FakePlayer {
            duration: 3000,
            ..Default::default()
        };
        let mut deck = PracticeDeck::new(Engine::new(dir, FftSize::Small), player);
        deck.open(sine_track(&dir.join("song.wav"), tempo));
        deck
    }

    #[test]
    fn test_open_points_player_at_original() {
        let dir = tempfile::tempdir().unwrap();
        let deck = deck(dir.path(), 100.0);

        assert_eq!(deck.player().source, Some(dir.path().join("song.wav")));
        assert_eq!(deck.player().rate, 1.0);
        assert_eq!(deck.key_shift(), 0);
        assert_eq!(deck.capo(), 0);
    }

    #[test]
    fn test_change_speed_clamps_rate() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);

        deck.change_speed(10.0);
        assert!((deck.playback_rate() - 1.1).abs() < 1e-6);
        assert!((deck.current_bpm() - 110.0).abs() < 1e-3);

        deck.change_speed(500.0);
        assert_eq!(deck.playback_rate(), MAX_PLAYBACK_RATE);
        deck.change_speed(-1000.0);
        assert_eq!(deck.playback_rate(), MIN_PLAYBACK_RATE);
        assert_eq!(deck.player().rate, MIN_PLAYBACK_RATE);
    }

    #[test]
    fn test_change_speed_without_tempo_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 0.0);
        deck.change_speed(5.0);
        assert_eq!(deck.playback_rate(), 1.0);
    }

    #[test]
    fn test_key_shift_preserves_transport() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);
        deck.set_playback_rate(0.8);
        deck.play();
        deck.seek_seconds(1.5);

        deck.key_up().unwrap();

        let player = deck.player();
        assert_ne!(player.source, Some(dir.path().join("song.wav")));
        assert_eq!(player.position, 1500);
        assert!(player.playing);
        assert_eq!(player.rate, 0.8);
        assert_eq!(deck.key_shift(), 1);

        deck.key_down().unwrap();
        assert_eq!(deck.player().source, Some(dir.path().join("song.wav")));
        assert_eq!(deck.player().position, 1500);
    }

    #[test]
    fn test_failed_shift_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);
        let sources = deck.player().sources_set;

        assert!(deck.set_key_shift(99).is_err());
        assert_eq!(deck.key_shift(), 0);
        assert_eq!(deck.player().sources_set, sources);
    }

    #[test]
    fn test_failed_write_returns_player_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let renders = dir.path().join("renders");
        std::fs::create_dir(&renders).unwrap();
        let original = dir.path().join("song.wav");

        let player = FakePlayer {
            duration: 3000,
            ..Default::default()
        };
        let mut deck = PracticeDeck::new(Engine::new(&renders, FftSize::Small), player);
        deck.open(sine_track(&original, 100.0));

        deck.key_up().unwrap();
        deck.play();
        deck.seek_seconds(2.0);
        assert_ne!(deck.player().source.as_deref(), Some(original.as_path()));

        std::fs::remove_dir_all(&renders).unwrap();

        assert!(matches!(deck.key_up(), Err(ShiftError::Io(_))));
        assert_eq!(deck.key_shift(), 0);
        assert_eq!(deck.engine().source_path(), Some(original.as_path()));

        let player = deck.player();
        assert_eq!(player.source.as_deref(), Some(original.as_path()));
        assert_eq!(player.position, 2000);
        assert!(player.playing);
    }

    #[test]
    fn test_capo_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);

        deck.capo_down();
        assert_eq!(deck.capo(), 0);
        for _ in 0..20 {
            deck.capo_up();
        }
        assert_eq!(deck.capo(), MAX_CAPO);
    }

    #[test]
    fn test_display_chords_follow_key_and_capo() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);
        assert_eq!(deck.display_chords(), ["C Maj", "G Maj", "N.C."]);

        deck.capo_up();
        deck.capo_up();
        assert_eq!(deck.display_offset(), 10);
        assert_eq!(deck.display_chords(), ["A# Maj", "F Maj", "N.C."]);
    }

    #[test]
    fn test_current_chord_follows_playhead() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);

        deck.seek_seconds(1.2);
        assert_eq!(deck.current_chord().as_deref(), Some("G Maj"));

        deck.nudge(-5.0);
        assert_eq!(deck.position_secs(), 0.0);
        assert_eq!(deck.current_chord().as_deref(), Some("C Maj"));

        deck.nudge(10.0);
        assert_eq!(deck.player().position, 3000);
        assert_eq!(deck.current_chord(), None);

        deck.seek_seconds(10.0);
        assert_eq!(deck.position_secs(), 3.0);
    }

    #[test]
    fn test_shape_follows_displayed_chord() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);
        assert_eq!(deck.chord_mode(), ChordMode::Beginner);

        deck.seek_seconds(1.2);
        assert_eq!(deck.current_shape(), &[(6, 3), (5, 2), (1, 3)]);

        // Capo 2 shows G as F
        deck.capo_up();
        deck.capo_up();
        deck.set_chord_mode(ChordMode::Advanced);

        let state = deck.state();
        assert_eq!(state.chord.as_deref(), Some("F Maj"));
        assert_eq!(state.chord_mode, ChordMode::Advanced);
        assert_eq!(state.shape.len(), 6);
        assert_eq!(capo_analysis::base_fret(state.shape), 1);

        deck.seek_seconds(2.5);
        assert_eq!(deck.state().chord.as_deref(), Some("N.C."));
        assert!(deck.state().shape.is_empty());
    }

    #[test]
    fn test_close_releases_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = deck(dir.path(), 100.0);
        deck.set_key_shift(-2).unwrap();
        let render = deck.engine().source_path().unwrap().to_path_buf();
        assert!(render.exists());

        deck.close();
        assert!(!render.exists());
        assert_eq!(deck.key_shift(), 0);
        assert!(!deck.player().playing);
        assert_eq!(deck.player().source, Some(dir.path().join("song.wav")));
    }
}

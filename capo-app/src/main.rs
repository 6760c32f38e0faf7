//! CAPO - guitar practice tool
//!
//! Command-line front end: analyze a track's tempo and chords, or render it
//! in another key at the same tempo.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use capo_analysis::{
    base_fret, chord_segments, display_label, display_offset, shape_for_label, unique_chords,
    ChordMode, FretPosition,
};
use capo_audio::{AnalysisWorker, Engine, MAX_CAPO};
use capo_library::Config;

use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load();

    let file = match cli.command {
        Command::Analyze {
            file,
            key,
            capo,
            shapes,
        } => {
            let file = config.resolve_track(&file);
            let capo = capo.unwrap_or(config.capo).min(MAX_CAPO);
            analyze(&config, &file, key, capo, shapes)?;
            file
        }
        Command::Shift {
            file,
            semitones,
            output,
        } => {
            let file = config.resolve_track(&file);
            shift(&config, &file, semitones, output)?;
            file
        }
    };

    remember_folder(&mut config, &file);
    Ok(())
}

fn analyze(
    config: &Config,
    file: &Path,
    key: i32,
    capo: u8,
    shapes: Option<ChordMode>,
) -> Result<()> {
    let mut worker = AnalysisWorker::spawn()?;
    worker.submit(file)?;
    let analyzed = worker
        .wait()
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    worker.shutdown();

    let mut engine = Engine::from_config(config);
    engine.install(analyzed);

    if let Some(track) = engine.track() {
        let meta = &track.metadata;
        println!("{}", meta.title);
        if !meta.artist.is_empty() {
            println!("  {} - {}", meta.artist, meta.album);
        }
        println!(
            "  {:.1} s, {} Hz, {} channel(s)",
            track.buffer.duration_secs(),
            track.buffer.sample_rate(),
            track.buffer.channel_count()
        );
    }

    let tempo = engine.tempo();
    if tempo > 0.0 {
        println!("Tempo: {:.0} BPM", tempo);
    } else {
        println!("Tempo: unknown");
    }

    let offset = display_offset(key, capo);
    println!("Key {:+}, capo {} (chords shown {:+} semitones)", key, capo, offset);

    let chords = engine.chords();
    let unique: Vec<String> = unique_chords(chords)
        .iter()
        .map(|c| display_label(&c.to_string(), offset))
        .collect();
    println!("Chords: {}", unique.join("  "));

    if let Some(mode) = shapes {
        println!();
        println!("Fingerings ({mode}):");
        for chord in &unique {
            let shape = shape_for_label(chord, mode);
            if !shape.is_empty() {
                println!("  {:<7} {}", chord, format_shape(shape));
            }
        }
    }
    println!();

    for segment in chord_segments(chords) {
        println!(
            "{:>5} - {:>5}  {}",
            format_time(segment.start_second),
            format_time(segment.end_second()),
            display_label(&segment.label.to_string(), offset)
        );
    }

    Ok(())
}

fn shift(config: &Config, file: &Path, semitones: i32, output: Option<PathBuf>) -> Result<()> {
    let mut engine = Engine::from_config(config);
    engine
        .load(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    if semitones == 0 {
        println!("No shift requested; the original is {}", file.display());
        return Ok(());
    }

    let rendered = engine
        .shift(semitones)
        .with_context(|| format!("Failed to shift {} by {:+}", file.display(), semitones))?;

    let output = output.unwrap_or_else(|| default_output(file, semitones));
    std::fs::copy(&rendered, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    engine.cleanup();

    println!("Wrote {}", output.display());
    Ok(())
}

fn default_output(file: &Path, semitones: i32) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());
    file.with_file_name(format!("{stem}_shift{semitones:+}.wav"))
}

/// `string:fret` pairs, plus the starting fret for shapes up the neck
fn format_shape(shape: &[FretPosition]) -> String {
    let notes: Vec<String> = shape
        .iter()
        .map(|(string, fret)| format!("{string}:{fret}"))
        .collect();
    match base_fret(shape) {
        1 => notes.join(" "),
        fret => format!("{}  ({fret}fr)", notes.join(" ")),
    }
}

fn format_time(seconds: usize) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn remember_folder(config: &mut Config, file: &Path) {
    let Some(folder) = file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    config.last_open_folder = Some(folder.to_path_buf());
    if let Err(e) = config.save() {
        tracing::warn!("Could not save config: {}", e);
    }
}

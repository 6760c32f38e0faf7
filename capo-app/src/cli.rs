use capo_analysis::ChordMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capo", about = "Tempo, chords and key shifting for guitar practice")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect tempo and the per-second chord sequence of a track
    Analyze {
        /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
        file: PathBuf,

        /// Key shift in semitones applied to the displayed chords
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        key: i32,

        /// Capo fret (0-11); defaults to the configured capo
        #[arg(short, long)]
        capo: Option<u8>,

        /// Also print a fingering for each chord: "beginner" or "advanced"
        #[arg(long, value_name = "MODE")]
        shapes: Option<ChordMode>,
    },

    /// Render a pitch-shifted copy of a track at the same tempo
    Shift {
        /// Input audio file
        file: PathBuf,

        /// Semitones to shift by (negative = down)
        #[arg(short, long, allow_hyphen_values = true)]
        semitones: i32,

        /// Output WAV file [default: <stem>_shift<N>.wav next to the input]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

//! Track library for CAPO - loading, sample buffers, and configuration

mod buffer;
mod config;
mod loader;

pub use buffer::{AudioBuffer, ChannelData};
pub use config::Config;
pub use loader::{LoadError, LoadedTrack, TrackLoader, TrackMetadata};

//! Simple configuration persistence for CAPO
//!
//! Stores user preferences like the last opened folder and where
//! pitch-shifted renders are written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Accepted pitch-shift analysis window sizes
const FFT_SIZES: [usize; 3] = [1024, 2048, 4096];

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Folder of the most recently opened track
    pub last_open_folder: Option<PathBuf>,
    /// Directory for temporary renders (system temp dir when unset)
    pub render_dir: Option<PathBuf>,
    /// Capo position applied when a track is opened (0-11)
    pub capo: u8,
    /// Phase vocoder window size used for key changes
    pub fft_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_open_folder: None,
            render_dir: None,
            capo: 0,
            fft_size: 2048,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("capo")
            .join("config.txt")
    }

    /// Directory renders go to
    pub fn render_dir(&self) -> PathBuf {
        self.render_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Resolve a track path given on the command line
    ///
    /// A relative path that does not exist from the working directory is
    /// looked up in the last opened folder instead.
    pub fn resolve_track(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        match &self.last_open_folder {
            Some(folder) if folder.join(path).exists() => {
                let resolved = folder.join(path);
                tracing::debug!("Resolved {} to {}", path.display(), resolved.display());
                resolved
            }
            _ => path.to_path_buf(),
        }
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "last_open_folder" if !value.is_empty() => {
                    config.last_open_folder = Some(PathBuf::from(value));
                }
                "render_dir" if !value.is_empty() => {
                    config.render_dir = Some(PathBuf::from(value));
                }
                "capo" => {
                    if let Ok(capo) = value.parse::<u8>() {
                        config.capo = capo.min(11);
                    }
                }
                "fft_size" => match value.parse::<usize>() {
                    Ok(size) if FFT_SIZES.contains(&size) => config.fft_size = size,
                    _ => tracing::warn!("ignoring fft_size={value}"),
                },
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec!["# CAPO Configuration".to_string()];

        if let Some(ref folder) = self.last_open_folder {
            lines.push(format!("last_open_folder={}", folder.display()));
        }
        if let Some(ref dir) = self.render_dir {
            lines.push(format!("render_dir={}", dir.display()));
        }
        lines.push(format!("capo={}", self.capo));
        lines.push(format!("fft_size={}", self.fft_size));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_with_folder() {
        let config = Config::parse("last_open_folder=/home/user/songs");
        assert_eq!(
            config.last_open_folder,
            Some(PathBuf::from("/home/user/songs"))
        );
    }

    #[test]
    fn test_parse_with_comments() {
        let content = "# Comment\nrender_dir=/tmp/capo\n# Another comment";
        let config = Config::parse(content);
        assert_eq!(config.render_dir, Some(PathBuf::from("/tmp/capo")));
        assert_eq!(config.render_dir(), PathBuf::from("/tmp/capo"));
    }

    #[test]
    fn test_capo_is_clamped() {
        assert_eq!(Config::parse("capo=5").capo, 5);
        assert_eq!(Config::parse("capo=30").capo, 11);
        assert_eq!(Config::parse("capo=-2").capo, 0);
    }

    #[test]
    fn test_invalid_fft_size_keeps_default() {
        assert_eq!(Config::parse("fft_size=4096").fft_size, 4096);
        assert_eq!(Config::parse("fft_size=3000").fft_size, 2048);
        assert_eq!(Config::parse("fft_size=big").fft_size, 2048);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config {
            last_open_folder: Some(PathBuf::from("/test/path")),
            render_dir: Some(PathBuf::from("/tmp/renders")),
            capo: 3,
            fft_size: 1024,
        };

        let parsed = Config::parse(&config.serialize());
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_resolve_track_uses_last_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("capo_resolve_song.wav"), b"").unwrap();

        let config = Config {
            last_open_folder: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        assert_eq!(
            config.resolve_track(Path::new("capo_resolve_song.wav")),
            dir.path().join("capo_resolve_song.wav")
        );
        assert_eq!(
            config.resolve_track(Path::new("capo_missing.wav")),
            PathBuf::from("capo_missing.wav")
        );
        assert_eq!(
            Config::default().resolve_track(Path::new("capo_resolve_song.wav")),
            PathBuf::from("capo_resolve_song.wav")
        );
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.txt");

        let config = Config {
            capo: 2,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}

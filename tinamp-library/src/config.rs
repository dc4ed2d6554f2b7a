//! Simple configuration persistence for Tinamp
//!
//! Stores user preferences such as volume and visualizer mode. Audio
//! graph state (EQ gains, retro mode) is not persisted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Output volume (0.0 - 1.0)
    pub volume: f32,
    /// Name of the initial visualizer mode
    pub visualizer_mode: String,
    /// Analysis transform size (power of two)
    pub fft_size: usize,
    /// Analysis smoothing time constant (0.0 - 1.0)
    pub smoothing: f32,
    /// Visualizer frames per second
    pub frame_rate: u32,
    /// Playlist restored on startup
    pub last_playlist: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volume: 0.5,
            visualizer_mode: "cascade".to_string(),
            fft_size: 2048,
            smoothing: 0.6,
            frame_rate: 30,
            last_playlist: None,
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
            .join("tinamp")
            .join("config.txt")
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
                "volume" => {
                    if let Ok(v) = value.parse::<f32>() {
                        config.volume = v.clamp(0.0, 1.0);
                    }
                }
                "visualizer_mode" => {
                    if !value.is_empty() {
                        config.visualizer_mode = value.to_lowercase();
                    }
                }
                "fft_size" => {
                    if let Ok(v) = value.parse::<usize>() {
                        if v.is_power_of_two() && (32..=32768).contains(&v) {
                            config.fft_size = v;
                        }
                    }
                }
                "smoothing" => {
                    if let Ok(v) = value.parse::<f32>() {
                        config.smoothing = v.clamp(0.0, 1.0);
                    }
                }
                "frame_rate" => {
                    if let Ok(v) = value.parse::<u32>() {
                        config.frame_rate = v.clamp(1, 120);
                    }
                }
                "last_playlist" => {
                    if !value.is_empty() {
                        config.last_playlist = Some(PathBuf::from(value));
                    }
                }
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec![
            "# Tinamp Configuration".to_string(),
            format!("volume={}", self.volume),
            format!("visualizer_mode={}", self.visualizer_mode),
            format!("fft_size={}", self.fft_size),
            format!("smoothing={}", self.smoothing),
            format!("frame_rate={}", self.frame_rate),
        ];
        if let Some(ref playlist) = self.last_playlist {
            lines.push(format!("last_playlist={}", playlist.display()));
        }
        lines.join("\n")
    }
}

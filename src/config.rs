use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::FrequencyAnalyzer;
use crate::color::{default_color_stops, resolve_stops, ColorError, ColorStop};
use crate::renderer::DrawParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid [audio] section: {0}")]
    Audio(#[from] crate::audio::AudioError),
    #[error("gain must be within 0.0..=1.0, got {0}")]
    Gain(f32),
    #[error("min_decibels ({min}) must be below max_decibels ({max})")]
    DecibelRange { min: f32, max: f32 },
    #[error("canvas must be at least 1x1, got {width}x{height}")]
    CanvasSize { width: usize, height: usize },
    #[error("fps must be between 1 and 240, got {0}")]
    Fps(u32),
    #[error("noise_probability must be within 0.0..=1.0, got {0}")]
    NoiseProbability(f64),
    #[error("invalid gradient: {0}")]
    Gradient(#[from] ColorError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub canvas: CanvasConfig,
    pub draw: DrawParams,
    /// Tracks offered by the track selector; the first one loads at startup.
    pub tracks: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Analysis window; the spectrum has `fft_size / 2` bins.
    pub fft_size: usize,
    pub gain: f32,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            gain: 0.5,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    pub noise_probability: f64,
    pub gradient: Vec<ColorStop>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            fps: 60,
            noise_probability: 0.05,
            gradient: default_color_stops(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            canvas: CanvasConfig::default(),
            draw: DrawParams::default(),
            tracks: vec![PathBuf::from("media/New Adventure Theme.mp3")],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/bitwave/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bitwave").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists.
    /// Returns None if the file is missing; a broken file is logged and ignored.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config at {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Initialize default config file at XDG path, returns the path
    pub fn init_default_config() -> Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, Self::generate_config_template())?;

        Ok(path)
    }

    /// Generate a commented TOML config template
    pub fn generate_config_template() -> String {
        r##"# Bitwave Configuration
# This file is auto-generated. Edit as needed.

# Tracks offered by the track selector ([n]ext / [p]revious).
# The first one is loaded at startup.
tracks = ["media/New Adventure Theme.mp3"]

[audio]
# Analysis window size: power of two between 32 and 32768.
# The spectrum has fft_size / 2 bins.
fft_size = 256
# Output volume (0.0-1.0)
gain = 0.5
# Smoothing between successive spectra (0.0-1.0, higher = smoother)
smoothing = 0.8
# Decibel range mapped onto amplitudes 0-255
min_decibels = -100.0
max_decibels = -30.0

[canvas]
# Pixel size of the drawing surface (fixed for the session)
width = 800
height = 400
# Target frames per second
fps = 60
# Chance that a pixel turns red when noise is enabled
noise_probability = 0.05
# Top-to-bottom gradient overlay: CSS color names or "#rrggbb"
gradient = [
    { percent = 0.0, color = "blue" },
    { percent = 0.25, color = "green" },
    { percent = 0.5, color = "yellow" },
    { percent = 0.75, color = "red" },
    { percent = 1.0, color = "magenta" },
]

[draw]
# Effects enabled at startup (toggle at runtime with keys 1-6)
show_gradient = true
show_bars = true
show_circles = true
show_noise = false
show_invert = false
show_emboss = false
"##
        .to_string()
    }

    /// Check values that would otherwise fail deep inside the renderer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        FrequencyAnalyzer::new(
            self.audio.fft_size,
            self.audio.smoothing,
            self.audio.min_decibels,
            self.audio.max_decibels,
        )?;
        if !(0.0..=1.0).contains(&self.audio.gain) {
            return Err(ConfigError::Gain(self.audio.gain));
        }
        if self.audio.min_decibels >= self.audio.max_decibels {
            return Err(ConfigError::DecibelRange {
                min: self.audio.min_decibels,
                max: self.audio.max_decibels,
            });
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::CanvasSize {
                width: self.canvas.width,
                height: self.canvas.height,
            });
        }
        if !(1..=240).contains(&self.canvas.fps) {
            return Err(ConfigError::Fps(self.canvas.fps));
        }
        if !(0.0..=1.0).contains(&self.canvas.noise_probability) {
            return Err(ConfigError::NoiseProbability(self.canvas.noise_probability));
        }
        resolve_stops(&self.canvas.gradient)?;
        Ok(())
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        if !args.track.is_empty() {
            self.tracks = args.track.clone();
        }

        // Audio settings
        if let Some(size) = args.fft_size {
            self.audio.fft_size = size;
        }
        if let Some(gain) = args.gain {
            self.audio.gain = gain.clamp(0.0, 1.0);
        }

        // Canvas settings
        if let Some(width) = args.width {
            self.canvas.width = width;
        }
        if let Some(height) = args.height {
            self.canvas.height = height;
        }
        if let Some(fps) = args.fps {
            self.canvas.fps = fps;
        }
        if let Some(p) = args.noise_probability {
            self.canvas.noise_probability = p;
        }

        // Effects
        if let Some(on) = args.gradient {
            self.draw.show_gradient = on;
        }
        if let Some(on) = args.bars {
            self.draw.show_bars = on;
        }
        if let Some(on) = args.circles {
            self.draw.show_circles = on;
        }
        if let Some(on) = args.noise {
            self.draw.show_noise = on;
        }
        if let Some(on) = args.invert {
            self.draw.show_invert = on;
        }
        if let Some(on) = args.emboss {
            self.draw.show_emboss = on;
        }
    }
}

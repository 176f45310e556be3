mod fft;
mod player;
mod tap;

pub use fft::FrequencyAnalyzer;
pub use player::Player;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("FFT size must be a power of two between 32 and 32768, got {0}")]
    InvalidFftSize(usize),
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
    #[error("failed to create audio sink: {0}")]
    Sink(#[from] rodio::PlayError),
}

/// Anything that can hand the renderer a byte spectrum.
pub trait SpectrumSource {
    /// Number of frequency bins per snapshot; fixed for the session.
    fn bin_count(&self) -> usize;

    /// Overwrite `into` with the latest amplitudes (0-255 per bin).
    fn refresh(&mut self, into: &mut [u8]);
}

/// Transport controls for the loaded track.
pub trait Playback {
    fn load_track(&mut self, path: &Path) -> Result<(), AudioError>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Output gain, clamped to `0.0..=1.0`.
    fn set_gain(&mut self, gain: f32);
    fn is_playing(&self) -> bool;
}

/// A spectrum that never changes. Used for headless renders and tests.
#[derive(Debug, Clone)]
pub struct FixedSpectrum {
    bins: Vec<u8>,
}

impl FixedSpectrum {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }
}

impl SpectrumSource for FixedSpectrum {
    fn bin_count(&self) -> usize {
        self.bins.len()
    }

    fn refresh(&mut self, into: &mut [u8]) {
        for (slot, value) in into.iter_mut().zip(self.bins.iter().cycle()) {
            *slot = *value;
        }
    }
}

/// Synthetic spectra for headless snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Silence,
    Full,
    #[default]
    Alternate,
    Ramp,
}

impl Pattern {
    pub fn spectrum(&self, bins: usize) -> FixedSpectrum {
        let values = (0..bins)
            .map(|i| match self {
                Pattern::Silence => 0,
                Pattern::Full => 255,
                Pattern::Alternate => {
                    if i % 2 == 0 {
                        0
                    } else {
                        255
                    }
                }
                Pattern::Ramp => (255 * i / bins.saturating_sub(1).max(1)) as u8,
            })
            .collect();
        FixedSpectrum::new(values)
    }
}

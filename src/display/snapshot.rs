use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

use crate::audio::Pattern;
use crate::config::Config;
use crate::renderer::{Canvas, Renderer};

/// Noise seed for snapshots, so repeated runs produce identical files.
const SNAPSHOT_SEED: u64 = 0x6269_7477;

/// Render `frames` frames from a synthetic spectrum without touching the
/// terminal or the audio device, then write the last one as a PNG.
pub fn run(config: &Config, path: &Path, frames: u32, pattern: Pattern) -> Result<()> {
    let bins = config.audio.fft_size / 2;
    let mut source = pattern.spectrum(bins);
    let mut renderer = Renderer::new(
        config.canvas.width,
        config.canvas.height,
        bins,
        &config.canvas.gradient,
        config.canvas.noise_probability,
    )?
    .with_rng(StdRng::seed_from_u64(SNAPSHOT_SEED));

    for _ in 0..frames.max(1) {
        renderer.paint(&mut source, &config.draw);
    }

    save_png(renderer.canvas(), path)?;
    info!(
        "Wrote {}x{} snapshot of {:?} (peak {}) after {} frames to {}",
        config.canvas.width,
        config.canvas.height,
        pattern,
        renderer.spectrum().iter().copied().max().unwrap_or(0),
        frames.max(1),
        path.display()
    );
    Ok(())
}

pub fn save_png(canvas: &Canvas, path: &Path) -> Result<()> {
    image::save_buffer(
        path,
        &canvas.data,
        canvas.width as u32,
        canvas.height as u32,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("Failed to write {}", path.display()))
}

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::AudioError;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

/// Byte spectrum analyser.
///
/// Keeps the most recent `fft_size` mono samples and turns them into
/// `fft_size / 2` byte amplitudes: Blackman window, forward FFT, magnitude
/// scaled by `1 / fft_size`, exponential smoothing over time, then decibels
/// mapped linearly from `[min_db, max_db]` onto `0..=255`.
pub struct FrequencyAnalyzer {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    write_pos: usize,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl FrequencyAnalyzer {
    pub fn new(fft_size: usize, smoothing: f32, min_db: f32, max_db: f32) -> Result<Self, AudioError> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(AudioError::InvalidFftSize(fft_size));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Blackman window, alpha = 0.16
        let n = fft_size as f32;
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (2.0 * std::f32::consts::PI * x).cos()
                    + 0.08 * (4.0 * std::f32::consts::PI * x).cos()
            })
            .collect();

        Ok(Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            min_db,
            max_db,
            fft,
            window,
            samples: vec![0.0; fft_size],
            write_pos: 0,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Append mono samples, keeping only the newest `fft_size`.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push_sample(sample);
        }
    }

    #[inline]
    pub fn push_sample(&mut self, sample: f32) {
        self.samples[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.fft_size;
    }

    /// Append `count` zero samples; a full window's worth flushes the ring.
    pub fn push_silence(&mut self, count: usize) {
        for _ in 0..count.min(self.fft_size) {
            self.push_sample(0.0);
        }
    }

    /// Forget buffered audio and smoothing history.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.smoothed.fill(0.0);
        self.write_pos = 0;
    }

    /// Fill `out` with the current byte spectrum. Extra output slots are
    /// zeroed; extra bins are dropped.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        // Oldest sample first
        for i in 0..self.fft_size {
            let sample = self.samples[(self.write_pos + i) % self.fft_size];
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() * scale;
            let value = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
            *smoothed = if value.is_finite() { value } else { 0.0 };
        }

        let range = self.max_db - self.min_db;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = match self.smoothed.get(i) {
                Some(&magnitude) => {
                    let db = 20.0 * magnitude.log10();
                    let scaled = 255.0 * (db - self.min_db) / range;
                    scaled.clamp(0.0, 255.0) as u8
                }
                None => 0,
            };
        }
    }
}

//! Pixel-based frame renderer
//!
//! Every frame is painted into an owned RGBA pixel buffer (`Canvas`). The
//! terminal presenter and the PNG snapshot writer read the canvas after
//! [`Renderer::paint`] returns.

pub mod effects;
pub mod layout;
pub mod stages;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::audio::SpectrumSource;
use crate::color::{ColorError, ColorStop, LinearGradient, Rgba};

/// Owned RGBA pixel buffer.
///
/// Internal format is 4 bytes per pixel in **RGBA** order with straight
/// (not pre-multiplied) alpha. Dimensions are fixed for the lifetime of
/// the canvas.
pub struct Canvas {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0u8; width * height * 4],
            width,
            height,
        }
    }

    /// Read the RGBA values at (x, y).
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> (u8, u8, u8, u8) {
        let idx = (y * self.width + x) * 4;
        if idx + 3 < self.data.len() {
            (self.data[idx], self.data[idx + 1], self.data[idx + 2], self.data[idx + 3])
        } else {
            (0, 0, 0, 0)
        }
    }

    /// Composite `color` over the pixel at (x, y) using source-over.
    /// `alpha` is the effective source alpha (color alpha times global alpha).
    #[inline]
    pub fn blend_pixel(&mut self, x: usize, y: usize, color: Rgba, alpha: f32) {
        if alpha <= 0.0 || x >= self.width || y >= self.height {
            return;
        }
        let alpha = alpha.min(1.0);
        let idx = (y * self.width + x) * 4;
        let px = &mut self.data[idx..idx + 4];

        let dst_a = px[3] as f32 / 255.0;
        let out_a = alpha + dst_a * (1.0 - alpha);
        let blend = |src: u8, dst: u8| -> u8 {
            let c = (src as f32 * alpha + dst as f32 * dst_a * (1.0 - alpha)) / out_a;
            c.round().clamp(0.0, 255.0) as u8
        };

        px[0] = blend(color.r, px[0]);
        px[1] = blend(color.g, px[1]);
        px[2] = blend(color.b, px[2]);
        px[3] = (out_a * 255.0).round() as u8;
    }

    /// Fill a rectangle; pixels whose centres fall inside are covered.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba, global_alpha: f32) {
        let (x, w) = normalize(x, w);
        let (y, h) = normalize(y, h);
        let alpha = color.a * global_alpha;
        for py in covered(y, h, self.height) {
            for px in covered(x, w, self.width) {
                self.blend_pixel(px, py, color, alpha);
            }
        }
    }

    /// Stroke a 1px outline centred on the rectangle's edges.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba, global_alpha: f32) {
        let (x, w) = normalize(x, w);
        let (y, h) = normalize(y, h);
        let alpha = color.a * global_alpha;

        let inner_x = covered(x + 0.5, w - 1.0, self.width);
        let inner_y = covered(y + 0.5, h - 1.0, self.height);

        for py in covered(y - 0.5, h + 1.0, self.height) {
            for px in covered(x - 0.5, w + 1.0, self.width) {
                if inner_x.contains(&px) && inner_y.contains(&py) {
                    continue;
                }
                self.blend_pixel(px, py, color, alpha);
            }
        }
    }

    /// Fill a full circle. A radius of zero or less paints nothing.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba, global_alpha: f32) {
        if radius <= 0.0 {
            return;
        }
        let alpha = color.a * global_alpha;
        if alpha <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        for py in covered(cy - radius, radius * 2.0, self.height) {
            let dy = py as f32 + 0.5 - cy;
            for px in covered(cx - radius, radius * 2.0, self.width) {
                let dx = px as f32 + 0.5 - cx;
                if dx * dx + dy * dy < r2 {
                    self.blend_pixel(px, py, color, alpha);
                }
            }
        }
    }

    /// Composite a vertical gradient over the whole canvas.
    pub fn fill_gradient(&mut self, gradient: &LinearGradient, global_alpha: f32) {
        for y in 0..self.height {
            let color = gradient.at(y);
            let alpha = color.a * global_alpha;
            for x in 0..self.width {
                self.blend_pixel(x, y, color, alpha);
            }
        }
    }
}

/// Flip negative extents the way canvas rectangles do.
#[inline]
fn normalize(start: f32, len: f32) -> (f32, f32) {
    if len < 0.0 {
        (start + len, -len)
    } else {
        (start, len)
    }
}

/// Pixel indices whose centres lie in `[start, start + len)`, clipped to `limit`.
#[inline]
fn covered(start: f32, len: f32, limit: usize) -> Range<usize> {
    if len <= 0.0 || !start.is_finite() || !len.is_finite() {
        return 0..0;
    }
    let lo = (start - 0.5).ceil().max(0.0) as usize;
    let hi = ((start + len - 0.5).ceil().max(0.0) as usize).min(limit);
    lo.min(hi)..hi
}

/// One of the six effects a frame can include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Gradient,
    Bars,
    Circles,
    Noise,
    Invert,
    Emboss,
}

impl Feature {
    pub fn all() -> &'static [Feature] {
        &[
            Feature::Gradient,
            Feature::Bars,
            Feature::Circles,
            Feature::Noise,
            Feature::Invert,
            Feature::Emboss,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Gradient => "gradient",
            Feature::Bars => "bars",
            Feature::Circles => "circles",
            Feature::Noise => "noise",
            Feature::Invert => "invert",
            Feature::Emboss => "emboss",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::all()
            .iter()
            .copied()
            .find(|feature| feature.name() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown feature: {}", s))
    }
}

/// Which effects the next frame paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawParams {
    pub show_gradient: bool,
    pub show_bars: bool,
    pub show_circles: bool,
    pub show_noise: bool,
    pub show_invert: bool,
    pub show_emboss: bool,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            show_gradient: true,
            show_bars: true,
            show_circles: true,
            show_noise: false,
            show_invert: false,
            show_emboss: false,
        }
    }
}

impl DrawParams {
    /// Every effect switched off; only the background fade runs.
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            show_gradient: false,
            show_bars: false,
            show_circles: false,
            show_noise: false,
            show_invert: false,
            show_emboss: false,
        }
    }

    pub fn get(&self, feature: Feature) -> bool {
        match feature {
            Feature::Gradient => self.show_gradient,
            Feature::Bars => self.show_bars,
            Feature::Circles => self.show_circles,
            Feature::Noise => self.show_noise,
            Feature::Invert => self.show_invert,
            Feature::Emboss => self.show_emboss,
        }
    }

    pub fn set(&mut self, feature: Feature, on: bool) {
        let slot = match feature {
            Feature::Gradient => &mut self.show_gradient,
            Feature::Bars => &mut self.show_bars,
            Feature::Circles => &mut self.show_circles,
            Feature::Noise => &mut self.show_noise,
            Feature::Invert => &mut self.show_invert,
            Feature::Emboss => &mut self.show_emboss,
        };
        *slot = on;
    }

    pub fn toggle(&mut self, feature: Feature) -> bool {
        let on = !self.get(feature);
        self.set(feature, on);
        on
    }
}

/// Paints one frame per call from the latest spectrum snapshot.
pub struct Renderer {
    canvas: Canvas,
    gradient: LinearGradient,
    spectrum: Vec<u8>,
    rng: StdRng,
    noise_probability: f64,
}

impl Renderer {
    pub fn new(
        width: usize,
        height: usize,
        bin_count: usize,
        color_stops: &[ColorStop],
        noise_probability: f64,
    ) -> Result<Self, ColorError> {
        Ok(Self {
            canvas: Canvas::new(width, height),
            gradient: LinearGradient::vertical(height, color_stops)?,
            spectrum: vec![0u8; bin_count],
            rng: StdRng::from_entropy(),
            noise_probability: noise_probability.clamp(0.0, 1.0),
        })
    }

    /// Replace the noise generator, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The snapshot read by the most recent [`Renderer::paint`].
    pub fn spectrum(&self) -> &[u8] {
        &self.spectrum
    }

    /// Paint exactly one frame. Stage order is fixed; only the background
    /// fade is unconditional.
    pub fn paint(&mut self, source: &mut dyn SpectrumSource, params: &DrawParams) {
        debug_assert_eq!(source.bin_count(), self.spectrum.len());
        source.refresh(&mut self.spectrum);

        stages::fade_background(&mut self.canvas);

        if params.show_gradient {
            stages::overlay_gradient(&mut self.canvas, &self.gradient);
        }
        if params.show_bars {
            stages::draw_bars(&mut self.canvas, &self.spectrum);
        }
        if params.show_circles {
            stages::draw_circles(&mut self.canvas, &self.spectrum);
        }

        if params.show_noise || params.show_invert {
            let noise = params.show_noise.then_some(self.noise_probability);
            effects::noise_and_invert(&mut self.canvas.data, &mut self.rng, noise, params.show_invert);
        }
        if params.show_emboss {
            effects::emboss(&mut self.canvas.data, self.canvas.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FixedSpectrum;
    use crate::color::{default_color_stops, make_color};

    fn renderer(width: usize, height: usize, bins: usize) -> Renderer {
        Renderer::new(width, height, bins, &default_color_stops(), 0.05)
            .unwrap()
            .with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn fill_rect_covers_pixel_centres() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_rect(2.0, 3.0, 2.5, 1.0, make_color(255, 255, 255, 1.0), 1.0);

        // Centres 2.5, 3.5 and 4.5 are inside [2.0, 4.5); 4.5 is not.
        assert_eq!(canvas.get_pixel(2, 3), (255, 255, 255, 255));
        assert_eq!(canvas.get_pixel(3, 3), (255, 255, 255, 255));
        assert_eq!(canvas.get_pixel(4, 3), (0, 0, 0, 0));
        assert_eq!(canvas.get_pixel(2, 4), (0, 0, 0, 0));
    }

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(-10.0, -10.0, 100.0, 100.0, Rgba::BLACK, 1.0);
        assert!(canvas.data.chunks(4).all(|px| px == [0, 0, 0, 255]));
        assert_eq!(canvas.data.len(), 4 * 4 * 4);
    }

    #[test]
    fn source_over_on_transparent_keeps_source_color() {
        let mut canvas = Canvas::new(1, 1);
        canvas.blend_pixel(0, 0, make_color(200, 100, 50, 0.5), 0.5);
        assert_eq!(canvas.get_pixel(0, 0), (200, 100, 50, 128));
    }

    #[test]
    fn source_over_mixes_with_opaque_destination() {
        let mut canvas = Canvas::new(1, 1);
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, make_color(255, 255, 255, 1.0), 1.0);
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Rgba::BLACK, 0.2);
        assert_eq!(canvas.get_pixel(0, 0), (204, 204, 204, 255));
    }

    #[test]
    fn stroke_rect_leaves_interior_alone() {
        let mut canvas = Canvas::new(10, 10);
        canvas.stroke_rect(2.0, 2.0, 5.0, 5.0, Rgba::BLACK, 1.0);
        assert_eq!(canvas.get_pixel(1, 1).3, 255);
        assert_eq!(canvas.get_pixel(6, 6).3, 255);
        assert_eq!(canvas.get_pixel(4, 4).3, 0);
        assert_eq!(canvas.get_pixel(8, 8).3, 0);
    }

    #[test]
    fn zero_radius_circle_paints_nothing() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle(4.0, 4.0, 0.0, Rgba::BLACK, 1.0);
        assert!(canvas.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn circle_is_symmetric() {
        let mut canvas = Canvas::new(20, 20);
        canvas.fill_circle(10.0, 10.0, 5.0, Rgba::BLACK, 1.0);
        assert_eq!(canvas.get_pixel(10, 10).3, 255);
        assert_eq!(canvas.get_pixel(5, 10).3, 255);
        assert_eq!(canvas.get_pixel(14, 10).3, 255);
        assert_eq!(canvas.get_pixel(15, 10).3, 0);
        assert_eq!(canvas.get_pixel(4, 10).3, 0);
    }

    #[test]
    fn feature_names_round_trip() {
        for feature in Feature::all() {
            assert_eq!(feature.name().parse::<Feature>().unwrap(), *feature);
        }
        assert!("sparkles".parse::<Feature>().is_err());
    }

    #[test]
    fn draw_params_toggle_flips_one_flag() {
        let mut params = DrawParams::default();
        assert!(!params.toggle(Feature::Bars));
        assert!(!params.show_bars);
        assert!(params.show_gradient && params.show_circles);
        assert!(params.toggle(Feature::Emboss));
        assert!(params.show_emboss);
    }

    #[test]
    fn paint_keeps_buffer_size_for_every_toggle_combination() {
        let mut source = FixedSpectrum::new((0..128).map(|i| (i * 2) as u8).collect());
        let mut renderer = renderer(200, 120, 128);

        for mask in 0u8..64 {
            let mut params = DrawParams::none();
            for (bit, feature) in Feature::all().iter().enumerate() {
                params.set(*feature, mask & (1 << bit) != 0);
            }
            renderer.paint(&mut source, &params);
            assert_eq!(renderer.canvas().data.len(), 200 * 120 * 4);
        }
    }

    #[test]
    fn paint_refreshes_snapshot_first() {
        let mut source = FixedSpectrum::new(vec![9; 16]);
        let mut renderer = renderer(64, 32, 16);
        renderer.paint(&mut source, &DrawParams::none());
        assert_eq!(renderer.spectrum(), &[9; 16]);
    }

    #[test]
    fn background_fade_always_runs() {
        let mut source = FixedSpectrum::new(vec![0; 8]);
        let mut renderer = renderer(16, 16, 8);
        renderer.paint(&mut source, &DrawParams::none());
        assert!(renderer.canvas().data.chunks(4).all(|px| px == [0, 0, 0, 26]));
    }

    #[test]
    fn only_bars_alternating_spectrum() {
        let bins: Vec<u8> = (0..128).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
        let mut source = FixedSpectrum::new(bins);
        let params = DrawParams {
            show_bars: true,
            ..DrawParams::none()
        };
        let mut renderer = renderer(800, 600, 128);
        renderer.paint(&mut source, &params);

        let layout = layout::compute_bar_layout(800, 128).unwrap();
        let canvas = renderer.canvas();
        for i in [0usize, 1, 2, 63, 126, 127] {
            let bar = layout.bar(i, renderer.spectrum()[i]);
            let cx = (bar.x + bar.width / 2.0) as usize;
            let top = bar.y as usize;
            // Inside the bar, just under the top stroke, the fill is visible.
            let (r, _, _, _) = canvas.get_pixel(cx, top + 2);
            assert!(r > 100, "bar {} missing fill at y={}", i, top + 2);
            // Well above the bar there is only background.
            let (r, _, _, _) = canvas.get_pixel(cx, top - 5);
            assert_eq!(r, 0, "bar {} painted above its top", i);
        }
    }
}

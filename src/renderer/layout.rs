//! Bar and ring geometry shared by the drawing stages.

use crate::color::{make_color, Rgba};

/// Gap between neighbouring bars, in pixels.
pub const BAR_SPACING: f32 = 4.0;
/// Left margin before the first bar and the reserved right margin.
pub const MARGIN: f32 = 5.0;
/// Every bar is drawn this tall; amplitude only moves it vertically.
pub const BAR_HEIGHT: f32 = 200.0;
/// Top of a bar at full amplitude.
pub const TOP_SPACING: f32 = 100.0;

/// Horizontal layout of one row of bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLayout {
    pub bar_width: f32,
    pub stride: f32,
}

/// Rectangle of a single bar in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub fn compute_bar_layout(width: usize, bin_count: usize) -> Option<BarLayout> {
    if bin_count == 0 {
        return None;
    }

    let bins = bin_count as f32;
    let total_spacing = bins * BAR_SPACING;
    let width_for_bars = width as f32 - total_spacing - MARGIN * 2.0;
    let bar_width = width_for_bars / bins;

    Some(BarLayout {
        bar_width,
        stride: bar_width + BAR_SPACING,
    })
}

impl BarLayout {
    /// Louder bins sit higher: the top edge is `TOP_SPACING + 256 - amplitude`.
    #[inline]
    pub fn bar(&self, index: usize, amplitude: u8) -> BarRect {
        BarRect {
            x: MARGIN + index as f32 * self.stride,
            y: TOP_SPACING + 256.0 - amplitude as f32,
            width: self.bar_width,
            height: BAR_HEIGHT,
        }
    }
}

/// One of the three concentric circles drawn per bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub radius: f32,
    pub color: Rgba,
}

/// Rings for one bin, in paint order: red, blue (wider), yellow (narrower).
/// Quieter bins get more opaque rings.
pub fn circle_rings(amplitude: u8, max_radius: f32) -> [Ring; 3] {
    let percent = amplitude as f32 / 255.0;
    let radius = percent * max_radius;

    [
        Ring {
            radius,
            color: make_color(255, 111, 111, 0.34 - percent / 3.0),
        },
        Ring {
            radius: radius * 1.5,
            color: make_color(0, 0, 255, 0.1 - percent / 10.0),
        },
        Ring {
            radius: radius * 0.5,
            color: make_color(200, 200, 0, 0.5 - percent / 5.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_width_splits_remaining_space() {
        let layout = compute_bar_layout(800, 128).unwrap();
        assert_eq!(layout.bar_width, (800.0 - 128.0 * 4.0 - 10.0) / 128.0);
        assert_eq!(layout.stride, layout.bar_width + 4.0);
        assert!(compute_bar_layout(800, 0).is_none());
    }

    #[test]
    fn silent_bins_drop_to_lowest_position() {
        let layout = compute_bar_layout(800, 128).unwrap();
        for i in 0..128 {
            assert_eq!(layout.bar(i, 0).y, TOP_SPACING + 256.0);
        }
    }

    #[test]
    fn loud_bins_rise_to_top_spacing() {
        let layout = compute_bar_layout(800, 128).unwrap();
        for i in 0..128 {
            let bar = layout.bar(i, 255);
            assert_eq!(bar.y, TOP_SPACING + 1.0);
            assert_eq!(bar.height, BAR_HEIGHT);
        }
    }

    #[test]
    fn alternating_bins_alternate_position_with_even_stride() {
        let layout = compute_bar_layout(800, 128).unwrap();
        let bars: Vec<BarRect> = (0..128)
            .map(|i| layout.bar(i, if i % 2 == 0 { 0 } else { 255 }))
            .collect();

        assert_eq!(bars.len(), 128);
        assert_eq!(bars[0].x, MARGIN);
        for pair in bars.windows(2) {
            assert!((pair[1].x - pair[0].x - layout.stride).abs() < 1e-3);
            assert!((pair[0].y - pair[1].y).abs() == 255.0);
        }
        assert_eq!(bars[0].y, TOP_SPACING + 256.0);
        assert_eq!(bars[1].y, TOP_SPACING + 1.0);
    }

    #[test]
    fn rings_collapse_for_silence() {
        let rings = circle_rings(0, 100.0);
        assert!(rings.iter().all(|ring| ring.radius == 0.0));
        assert_eq!(rings[0].color.a, 0.34);
        assert_eq!(rings[2].color.a, 0.5);
    }

    #[test]
    fn rings_reach_max_radius_at_full_amplitude() {
        let rings = circle_rings(255, 100.0);
        assert_eq!(rings[0].radius, 100.0);
        assert_eq!(rings[1].radius, 150.0);
        assert_eq!(rings[2].radius, 50.0);
        assert!(rings[1].color.a.abs() < 1e-6);
    }
}

//! Vector drawing stages of a frame.
//!
//! Each function composites shapes onto the canvas in place. Pixel-level
//! post-processing lives in [`super::effects`].

use super::layout::{circle_rings, compute_bar_layout};
use super::Canvas;
use crate::color::{make_color, LinearGradient, Rgba};

/// Opacity of the black layer laid over the previous frame.
pub const FADE_ALPHA: f32 = 0.1;
pub const GRADIENT_ALPHA: f32 = 0.3;
pub const CIRCLE_ALPHA: f32 = 0.5;

/// Darken the previous frame instead of clearing it, leaving motion trails.
pub fn fade_background(canvas: &mut Canvas) {
    let (w, h) = (canvas.width as f32, canvas.height as f32);
    canvas.fill_rect(0.0, 0.0, w, h, Rgba::BLACK, FADE_ALPHA);
}

pub fn overlay_gradient(canvas: &mut Canvas, gradient: &LinearGradient) {
    canvas.fill_gradient(gradient, GRADIENT_ALPHA);
}

/// One translucent white bar per bin with a dark outline.
pub fn draw_bars(canvas: &mut Canvas, spectrum: &[u8]) {
    let Some(layout) = compute_bar_layout(canvas.width, spectrum.len()) else {
        return;
    };
    let fill = make_color(255, 255, 255, 0.5);
    let stroke = make_color(0, 0, 0, 0.5);

    for (i, &amplitude) in spectrum.iter().enumerate() {
        let bar = layout.bar(i, amplitude);
        canvas.fill_rect(bar.x, bar.y, bar.width, bar.height, fill, 1.0);
        canvas.stroke_rect(bar.x, bar.y, bar.width, bar.height, stroke, 1.0);
    }
}

/// Three concentric circles per bin, all centred on the canvas.
pub fn draw_circles(canvas: &mut Canvas, spectrum: &[u8]) {
    let cx = canvas.width as f32 / 2.0;
    let cy = canvas.height as f32 / 2.0;
    let max_radius = canvas.height as f32 / 4.0;

    for &amplitude in spectrum {
        for ring in circle_rings(amplitude, max_radius) {
            canvas.fill_circle(cx, cy, ring.radius, ring.color, CIRCLE_ALPHA);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::default_color_stops;

    #[test]
    fn fade_converges_towards_opaque_black() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, make_color(255, 255, 255, 1.0), 1.0);
        for _ in 0..100 {
            fade_background(&mut canvas);
        }
        let (r, g, b, a) = canvas.get_pixel(2, 2);
        assert!(r < 10 && g < 10 && b < 10, "still bright: {} {} {}", r, g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn gradient_tints_top_blue_and_bottom_magenta() {
        let gradient = LinearGradient::vertical(100, &default_color_stops()).unwrap();
        let mut canvas = Canvas::new(10, 100);
        overlay_gradient(&mut canvas, &gradient);

        let (r, _, b, a) = canvas.get_pixel(5, 0);
        assert!(b > 240 && r < 10);
        assert_eq!(a, 77);
        let (r, g, b, _) = canvas.get_pixel(5, 99);
        assert!(r > 240 && b > 240 && g < 10);
    }

    #[test]
    fn silent_circles_paint_nothing() {
        let mut canvas = Canvas::new(64, 64);
        draw_circles(&mut canvas, &[0; 32]);
        assert!(canvas.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn loud_circles_reach_quarter_height() {
        let mut canvas = Canvas::new(200, 200);
        draw_circles(&mut canvas, &[255]);

        // max radius 50: the 75px blue ring reaches further than the red one.
        // Its alpha is zero at full amplitude, so only the red ring shows at 60px.
        assert!(canvas.get_pixel(100 + 45, 100).3 > 0);
        assert_eq!(canvas.get_pixel(100 + 60, 100).3, 0);
    }

    #[test]
    fn bars_skip_empty_spectrum() {
        let mut canvas = Canvas::new(32, 32);
        draw_bars(&mut canvas, &[]);
        assert!(canvas.data.iter().all(|&b| b == 0));
    }
}

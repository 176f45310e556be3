use palette::{Mix, Srgb};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A straight (non pre-multiplied) RGBA fill color.
///
/// Channels are bytes, alpha is a fraction in `0.0..=1.0` the way CSS
/// `rgba()` expresses it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 1.0 };

    /// Parse a CSS color name ("magenta") or hex string ("#ff00ff").
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let rgb: Srgb<u8> = if name.starts_with('#') {
            name.parse().ok()?
        } else {
            palette::named::from_str(&name.to_lowercase())?
        };
        Some(make_color(rgb.red, rgb.green, rgb.blue, 1.0))
    }

    fn to_srgb(self) -> Srgb<f32> {
        Srgb::new(self.r, self.g, self.b).into_format()
    }
}

/// Build a fill color; alpha is clamped to `0.0..=1.0` like CSS does.
pub fn make_color(r: u8, g: u8, b: u8, alpha: f32) -> Rgba {
    Rgba {
        r,
        g,
        b,
        a: alpha.clamp(0.0, 1.0),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ColorError {
    #[error("unknown color '{0}'")]
    UnknownColor(String),
    #[error("gradient stop position {0} is outside 0.0..=1.0")]
    StopOutOfRange(f32),
    #[error("gradient stops must be sorted by position")]
    UnsortedStops,
    #[error("gradient needs at least one color stop")]
    NoStops,
}

/// One `(position, color)` pair of a linear gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub percent: f32,
    pub color: String,
}

impl ColorStop {
    pub fn new(percent: f32, color: &str) -> Self {
        Self {
            percent,
            color: color.to_string(),
        }
    }
}

/// Blue, green, yellow, red, magenta from top to bottom.
pub fn default_color_stops() -> Vec<ColorStop> {
    vec![
        ColorStop::new(0.0, "blue"),
        ColorStop::new(0.25, "green"),
        ColorStop::new(0.5, "yellow"),
        ColorStop::new(0.75, "red"),
        ColorStop::new(1.0, "magenta"),
    ]
}

/// Vertical gradient precomputed to one color per canvas row.
#[derive(Debug, Clone)]
pub struct LinearGradient {
    rows: Vec<Rgba>,
}

impl LinearGradient {
    /// Build a gradient running from `y = 0` to `y = height`.
    pub fn vertical(height: usize, stops: &[ColorStop]) -> Result<Self, ColorError> {
        let resolved = resolve_stops(stops)?;
        let rows = (0..height)
            .map(|y| {
                let t = (y as f32 + 0.5) / height as f32;
                sample(&resolved, t)
            })
            .collect();
        Ok(Self { rows })
    }

    /// Color of row `y`, clamped to the last row.
    #[inline]
    pub fn at(&self, y: usize) -> Rgba {
        match self.rows.get(y) {
            Some(color) => *color,
            None => self.rows.last().copied().unwrap_or(Rgba::BLACK),
        }
    }
}

/// Check a stop list and turn color names into colors.
pub fn resolve_stops(stops: &[ColorStop]) -> Result<Vec<(f32, Rgba)>, ColorError> {
    if stops.is_empty() {
        return Err(ColorError::NoStops);
    }

    let mut resolved = Vec::with_capacity(stops.len());
    let mut previous = 0.0f32;
    for stop in stops {
        if !(0.0..=1.0).contains(&stop.percent) {
            return Err(ColorError::StopOutOfRange(stop.percent));
        }
        if stop.percent < previous {
            return Err(ColorError::UnsortedStops);
        }
        previous = stop.percent;

        let color =
            Rgba::parse(&stop.color).ok_or_else(|| ColorError::UnknownColor(stop.color.clone()))?;
        resolved.push((stop.percent, color));
    }
    Ok(resolved)
}

/// Interpolate the resolved stops at `t`; clamps to the end stops.
fn sample(stops: &[(f32, Rgba)], t: f32) -> Rgba {
    let (first_pos, first) = stops[0];
    if t <= first_pos {
        return first;
    }

    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t <= p1 {
            let span = p1 - p0;
            if span <= f32::EPSILON {
                return c1;
            }
            let mixed = c0.to_srgb().mix(c1.to_srgb(), (t - p0) / span);
            let mixed: Srgb<u8> = mixed.into_format();
            return make_color(mixed.red, mixed.green, mixed.blue, 1.0);
        }
    }

    stops[stops.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_names_and_hex() {
        assert_eq!(Rgba::parse("magenta"), Some(make_color(255, 0, 255, 1.0)));
        assert_eq!(Rgba::parse("Green"), Some(make_color(0, 128, 0, 1.0)));
        assert_eq!(Rgba::parse("#ff8000"), Some(make_color(255, 128, 0, 1.0)));
        assert_eq!(Rgba::parse("not-a-color"), None);
    }

    #[test]
    fn make_color_clamps_alpha() {
        assert_eq!(make_color(1, 2, 3, -0.2).a, 0.0);
        assert_eq!(make_color(1, 2, 3, 1.7).a, 1.0);
    }

    #[test]
    fn gradient_ends_match_first_and_last_stop() {
        let gradient = LinearGradient::vertical(400, &default_color_stops()).unwrap();
        assert_eq!(gradient.rows.len(), 400);

        let top = gradient.at(0);
        assert!(top.b > 250 && top.r < 5 && top.g < 5, "top was {:?}", top);

        let bottom = gradient.at(399);
        assert!(bottom.r > 250 && bottom.b > 250 && bottom.g < 5, "bottom was {:?}", bottom);
    }

    #[test]
    fn gradient_hits_middle_stop() {
        // Row 199 samples t = 0.49875, just short of the yellow stop.
        let gradient = LinearGradient::vertical(400, &default_color_stops()).unwrap();
        let mid = gradient.at(199);
        assert!(mid.r >= 250 && mid.g >= 250 && mid.b == 0, "mid was {:?}", mid);
    }

    #[test]
    fn rejects_bad_stops() {
        assert_eq!(
            resolve_stops(&[ColorStop::new(0.0, "plaid")]).unwrap_err(),
            ColorError::UnknownColor("plaid".into())
        );
        assert_eq!(
            resolve_stops(&[ColorStop::new(0.5, "red"), ColorStop::new(0.2, "blue")]).unwrap_err(),
            ColorError::UnsortedStops
        );
        assert_eq!(
            resolve_stops(&[ColorStop::new(1.5, "red")]).unwrap_err(),
            ColorError::StopOutOfRange(1.5)
        );
        assert_eq!(resolve_stops(&[]).unwrap_err(), ColorError::NoStops);
    }
}

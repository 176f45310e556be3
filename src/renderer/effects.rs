//! Whole-buffer pixel passes: red noise, channel invert and emboss.
//!
//! All passes work on a raw RGBA byte slice so they can be applied to any
//! buffer laid out like [`super::Canvas::data`].

use rand::Rng;

/// Walk every pixel once. With `noise` set, each pixel independently turns
/// pure red with that probability; with `invert`, RGB becomes `255 - c`.
/// Invert runs after the noise write of the same pixel. Alpha is untouched.
pub fn noise_and_invert<R: Rng + ?Sized>(
    data: &mut [u8],
    rng: &mut R,
    noise: Option<f64>,
    invert: bool,
) {
    for px in data.chunks_exact_mut(4) {
        if let Some(probability) = noise {
            if rng.gen::<f64>() < probability {
                px[1] = 0;
                px[2] = 0;
                px[0] = 255;
            }
        }

        if invert {
            px[0] = 255 - px[0];
            px[1] = 255 - px[1];
            px[2] = 255 - px[2];
        }
    }
}

/// Two-tap relief filter: each colour byte becomes
/// `127 + 2*self - right - below`, clamped to a byte.
///
/// Runs in place, front to back over the linear buffer, so the right tap
/// of a row's last pixel is the next row's first pixel. A tap past the
/// end of the buffer yields 0.
pub fn emboss(data: &mut [u8], width: usize) {
    let len = data.len();
    let row = width * 4;

    for i in 0..len {
        if i % 4 == 3 {
            continue;
        }
        let (Some(&right), Some(&below)) = (data.get(i + 4), data.get(i + row)) else {
            data[i] = 0;
            continue;
        };
        let value = 127 + 2 * data[i] as i32 - right as i32 - below as i32;
        data[i] = value.clamp(0, 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn buffer(width: usize, height: usize) -> Vec<u8> {
        (0..width * height * 4).map(|i| (i * 37 % 251) as u8).collect()
    }

    #[test]
    fn invert_twice_restores_buffer() {
        let original = buffer(16, 9);
        let mut data = original.clone();
        let mut rng = StdRng::seed_from_u64(1);

        noise_and_invert(&mut data, &mut rng, None, true);
        assert_ne!(data, original);
        noise_and_invert(&mut data, &mut rng, None, true);
        assert_eq!(data, original);
    }

    #[test]
    fn invert_keeps_alpha() {
        let mut data = vec![10, 20, 30, 40];
        noise_and_invert(&mut data, &mut StdRng::seed_from_u64(1), None, true);
        assert_eq!(data, vec![245, 235, 225, 40]);
    }

    #[test]
    fn zero_noise_probability_changes_nothing() {
        let original = buffer(16, 9);
        let mut data = original.clone();
        noise_and_invert(&mut data, &mut StdRng::seed_from_u64(2), Some(0.0), false);
        assert_eq!(data, original);
    }

    #[test]
    fn certain_noise_turns_every_pixel_red() {
        let mut data = buffer(16, 9);
        let alphas: Vec<u8> = data.chunks(4).map(|px| px[3]).collect();
        noise_and_invert(&mut data, &mut StdRng::seed_from_u64(3), Some(1.0), false);

        for (px, alpha) in data.chunks(4).zip(alphas) {
            assert_eq!(px, [255, 0, 0, alpha]);
        }
    }

    #[test]
    fn noise_then_invert_gives_cyan() {
        let mut data = buffer(4, 4);
        noise_and_invert(&mut data, &mut StdRng::seed_from_u64(4), Some(1.0), true);
        assert!(data.chunks(4).all(|px| px[..3] == [0, 255, 255]));
    }

    #[test]
    fn noise_rate_is_roughly_five_percent() {
        let mut data = vec![0u8; 200 * 200 * 4];
        noise_and_invert(&mut data, &mut StdRng::seed_from_u64(5), Some(0.05), false);
        let red = data.chunks(4).filter(|px| px[0] == 255).count();
        let rate = red as f64 / (200.0 * 200.0);
        assert!((0.04..0.06).contains(&rate), "rate was {}", rate);
    }

    #[test]
    fn emboss_flattens_uniform_buffer_to_mid_grey() {
        let (width, height) = (8, 6);
        let mut data: Vec<u8> = [90, 140, 200, 255].repeat(width * height);
        emboss(&mut data, width);

        for y in 0..height - 1 {
            for x in 0..width {
                let idx = (y * width + x) * 4;
                assert_eq!(&data[idx..idx + 4], &[127, 127, 127, 255], "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn emboss_zeroes_last_row() {
        let (width, height) = (5, 3);
        let mut data = vec![100u8; width * height * 4];
        emboss(&mut data, width);

        let last_row = (height - 1) * width * 4;
        for px in data[last_row..].chunks(4) {
            assert_eq!(px, [0, 0, 0, 100]);
        }
    }

    #[test]
    fn emboss_clamps_to_byte_range() {
        // 1x3 column: one bright pixel above two dark ones.
        let mut data = vec![255, 255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255];
        emboss(&mut data, 1);
        // 127 + 510 - 0 - 0 clamps to 255.
        assert_eq!(&data[0..3], &[255, 255, 255]);
    }

    #[test]
    fn emboss_right_tap_wraps_to_next_row() {
        // 2x2 image; pixel (1, 0) uses pixel (0, 1) as its right neighbour.
        let mut data = vec![
            50, 50, 50, 255, 50, 50, 50, 255, //
            10, 10, 10, 255, 50, 50, 50, 255,
        ];
        emboss(&mut data, 2);
        // (1,0): 127 + 100 - 10 - 50
        assert_eq!(&data[4..7], &[167, 167, 167]);
    }
}

//! Grayscale normalizer.
//!
//! Uses the BT.601 luma weights in 14-bit fixed point,
//! `(4899 R + 9617 G + 1868 B + 8192) >> 14`, so conversion is deterministic
//! and bit-exact across platforms. Alpha is ignored. Single-channel input is
//! copied unchanged, which makes the conversion idempotent.

use crate::image::{Channels, ColorView, OwnedImage};

const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;
const HALF: u32 = 1 << (SHIFT - 1);

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = R_WEIGHT * u32::from(r) + G_WEIGHT * u32::from(g) + B_WEIGHT * u32::from(b);
    ((sum + HALF) >> SHIFT) as u8
}

/// Converts any supported layout to an owned single-channel image.
pub fn to_grayscale(image: ColorView<'_>) -> OwnedImage {
    let width = image.width();
    let height = image.height();
    let step = image.channels().count();
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let Some(row) = image.row(y) else {
            break;
        };
        match image.channels() {
            Channels::Gray => data.extend_from_slice(row),
            Channels::Rgb | Channels::Rgba => {
                data.extend(row.chunks_exact(step).map(|px| luma(px[0], px[1], px[2])));
            }
        }
    }
    OwnedImage::from_vec_unchecked(data, width, height)
}

#[cfg(test)]
mod tests {
    use super::{luma, to_grayscale};
    use crate::image::ColorView;

    #[test]
    fn primaries_use_bt601_weights() {
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
    }

    #[test]
    fn rgba_ignores_alpha() {
        let rgba = [10u8, 20, 30, 0, 10, 20, 30, 255];
        let gray = to_grayscale(ColorView::rgba(&rgba, 2, 1).unwrap());
        assert_eq!(gray.data()[0], gray.data()[1]);
    }

    #[test]
    fn gray_input_is_copied_verbatim() {
        let data: Vec<u8> = (0u8..20).map(|v| v.wrapping_mul(37)).collect();
        let once = to_grayscale(ColorView::gray(&data, 5, 4).unwrap());
        assert_eq!(once.data(), data.as_slice());
        let twice = to_grayscale(ColorView::from(&once));
        assert_eq!(twice, once);
    }
}

//! Octave pyramid for keypoint detection.
//!
//! Each level halves the previous one with a 2x2 box filter,
//! `dst = (a + b + c + d + 2) / 4`. Level `i` has scale `2^i` relative to the
//! base, so a coordinate `p` on level `i` maps to `p * scale` on the base.

use crate::image::{ImageView, OwnedImage};

/// One pyramid level with its scale factor back to the base image.
pub struct PyramidLevel {
    pub image: OwnedImage,
    pub scale: f32,
}

/// Owned grayscale pyramid built from a base level.
pub struct ImagePyramid {
    levels: Vec<PyramidLevel>,
}

impl ImagePyramid {
    /// Builds up to `max_levels` levels, stopping before a level would be
    /// narrower or shorter than `min_side`. The base level is always kept.
    pub fn build(base: ImageView<'_, u8>, max_levels: usize, min_side: usize) -> Self {
        let mut levels = vec![PyramidLevel {
            image: OwnedImage::from_view(base),
            scale: 1.0,
        }];

        while levels.len() < max_levels.max(1) {
            let prev = &levels[levels.len() - 1];
            let src = prev.image.view();
            let dst_width = src.width() / 2;
            let dst_height = src.height() / 2;
            if dst_width < min_side.max(1) || dst_height < min_side.max(1) {
                break;
            }

            let mut dst = Vec::with_capacity(dst_width * dst_height);
            for y in 0..dst_height {
                let (Some(top), Some(bottom)) = (src.row(2 * y), src.row(2 * y + 1)) else {
                    break;
                };
                dst.extend(
                    top.chunks_exact(2)
                        .zip(bottom.chunks_exact(2))
                        .take(dst_width)
                        .map(|(t, b)| {
                            let sum = u16::from(t[0]) + u16::from(t[1]) + u16::from(b[0]) + u16::from(b[1]);
                            ((sum + 2) / 4) as u8
                        }),
                );
            }

            let scale = prev.scale * 2.0;
            levels.push(PyramidLevel {
                image: OwnedImage::from_vec_unchecked(dst, dst_width, dst_height),
                scale,
            });
        }

        Self { levels }
    }

    /// Returns all levels, finest first.
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }
}

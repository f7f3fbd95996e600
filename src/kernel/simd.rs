//! SIMD numerator kernel using the `wide` crate (feature `simd`).
//!
//! Only the `sum(t' * I)` inner loop is vectorized, eight pattern pixels at a
//! time; window statistics still come from the integral images.

use crate::kernel::Kernel;
use crate::template::TemplatePlan;
use crate::ImageView;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_u8x8(slice: &[u8]) -> f32x8 {
    f32x8::from([
        f32::from(slice[0]),
        f32::from(slice[1]),
        f32::from(slice[2]),
        f32::from(slice[3]),
        f32::from(slice[4]),
        f32::from(slice[5]),
        f32::from(slice[6]),
        f32::from(slice[7]),
    ])
}

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// SIMD ZNCC kernel.
pub struct ZnccSimd;

impl Kernel for ZnccSimd {
    fn dot_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> f64 {
        let tpl_width = plan.width();
        let simd_end = tpl_width / LANES * LANES;
        let mut dot = 0.0f64;

        for (ty, tpl_row) in plan.t_prime().chunks_exact(tpl_width).enumerate() {
            let Some(img_row) = image.row(y + ty) else {
                break;
            };
            let window = &img_row[x..x + tpl_width];

            let mut acc = f32x8::ZERO;
            let mut tx = 0;
            while tx < simd_end {
                acc += load_f32x8(&tpl_row[tx..]) * load_u8x8(&window[tx..]);
                tx += LANES;
            }
            let mut row_dot: f32 = acc.to_array().iter().sum();
            while tx < tpl_width {
                row_dot += tpl_row[tx] * f32::from(window[tx]);
                tx += 1;
            }
            dot += f64::from(row_dot);
        }
        dot
    }
}

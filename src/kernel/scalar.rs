//! Scalar reference kernel.

use crate::kernel::Kernel;
use crate::template::TemplatePlan;
use crate::ImageView;

/// Scalar ZNCC kernel.
pub struct ZnccScalar;

impl Kernel for ZnccScalar {
    fn dot_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> f64 {
        let tpl_width = plan.width();
        let t_prime = plan.t_prime();
        let mut dot = 0.0f64;
        for (ty, tpl_row) in t_prime.chunks_exact(tpl_width).enumerate() {
            let Some(img_row) = image.row(y + ty) else {
                break;
            };
            let window = &img_row[x..x + tpl_width];
            let mut row_dot = 0.0f32;
            for (&t, &v) in tpl_row.iter().zip(window) {
                row_dot += t * f32::from(v);
            }
            dot += f64::from(row_dot);
        }
        dot
    }
}

//! Row-parallel score maps (feature `rayon`).
//!
//! Each output row of the score map is filled by one task; the per-placement
//! arithmetic is the same kernel the sequential path uses, so results are
//! bit-identical.

use crate::kernel::{normalize, placement_range, Kernel, ScoreMap, WindowSums};
use crate::template::TemplatePlan;
use crate::ImageView;
use rayon::prelude::*;

/// Parallel counterpart of `Kernel::score_map`.
pub fn score_map_par<K: Kernel>(image: ImageView<'_, u8>, plan: &TemplatePlan) -> Option<ScoreMap> {
    let (map_width, map_height) = placement_range(image, plan)?;
    let sums = WindowSums::new(image);
    let mut data = vec![0.0f32; map_width * map_height];
    data.par_chunks_mut(map_width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let (sum, sum_sq) = sums.window(x, y, plan.width(), plan.height());
                let dot = K::dot_at(image, plan, x, y);
                *out = normalize(dot, sum, sum_sq, plan);
            }
        });
    Some(ScoreMap::from_parts(data, map_width, map_height))
}

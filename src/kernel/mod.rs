//! Correlation kernels producing dense ZNCC score maps.
//!
//! The score at placement `(x, y)` is the normalized cross-correlation
//! coefficient between the zero-mean pattern and the scene window whose
//! top-left corner is `(x, y)`; it lies in `[-1, 1]`, higher is more similar.
//! Windows with zero intensity variance score `0.0`, as does every window
//! when the pattern itself is flat.

use crate::template::TemplatePlan;
use crate::ImageView;

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

#[cfg(not(feature = "simd"))]
pub(crate) use scalar::ZnccScalar as ZnccDefault;
#[cfg(feature = "simd")]
pub(crate) use simd::ZnccSimd as ZnccDefault;

/// Kernel trait for single placements and full score maps.
pub trait Kernel {
    /// Correlation numerator `sum(t' * I)` for the window at `(x, y)`.
    ///
    /// Callers guarantee the window lies inside the image.
    fn dot_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> f64;

    /// Score at a single placement, or `None` when the window leaves the image.
    fn score_at(
        image: ImageView<'_, u8>,
        sums: &WindowSums,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> Option<f32> {
        if x + plan.width() > image.width() || y + plan.height() > image.height() {
            return None;
        }
        let (sum, sum_sq) = sums.window(x, y, plan.width(), plan.height());
        let dot = Self::dot_at(image, plan, x, y);
        Some(normalize(dot, sum, sum_sq, plan))
    }

    /// Scores every valid placement; `None` when the pattern does not fit.
    fn score_map(image: ImageView<'_, u8>, plan: &TemplatePlan) -> Option<ScoreMap> {
        let (map_width, map_height) = placement_range(image, plan)?;
        let sums = WindowSums::new(image);
        let mut data = Vec::with_capacity(map_width * map_height);
        for y in 0..map_height {
            for x in 0..map_width {
                let (sum, sum_sq) = sums.window(x, y, plan.width(), plan.height());
                let dot = Self::dot_at(image, plan, x, y);
                data.push(normalize(dot, sum, sum_sq, plan));
            }
        }
        Some(ScoreMap {
            data,
            width: map_width,
            height: map_height,
        })
    }
}

/// Number of valid placements along each axis.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> Option<(usize, usize)> {
    if plan.width() > image.width() || plan.height() > image.height() {
        return None;
    }
    Some((
        image.width() - plan.width() + 1,
        image.height() - plan.height() + 1,
    ))
}

/// Turns a raw numerator into a correlation coefficient.
#[inline]
pub(crate) fn normalize(dot: f64, sum: u64, sum_sq: u64, plan: &TemplatePlan) -> f32 {
    if plan.is_flat() {
        return 0.0;
    }
    let n = plan.area() as u128;
    // n * var_i, exact in integers.
    let scaled_var = n * u128::from(sum_sq) - u128::from(sum) * u128::from(sum);
    if scaled_var == 0 {
        return 0.0;
    }
    let var_i = scaled_var as f64 / n as f64;
    let mean_i = sum as f64 / n as f64;
    let num = dot - plan.t_prime_sum() * mean_i;
    let score = num / (plan.var_t() * var_i).sqrt();
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Integral images of intensity and squared intensity.
///
/// Window sums are exact, which keeps flat windows at exactly zero variance.
pub struct WindowSums {
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
    stride: usize,
}

impl WindowSums {
    /// Builds both integral images in one pass.
    pub fn new(image: ImageView<'_, u8>) -> Self {
        let stride = image.width() + 1;
        let rows = image.height() + 1;
        let mut sum = vec![0u64; stride * rows];
        let mut sum_sq = vec![0u64; stride * rows];
        for y in 0..image.height() {
            let Some(row) = image.row(y) else {
                break;
            };
            let mut run = 0u64;
            let mut run_sq = 0u64;
            for (x, &value) in row.iter().enumerate() {
                let v = u64::from(value);
                run += v;
                run_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + run;
                sum_sq[idx] = sum_sq[idx - stride] + run_sq;
            }
        }
        Self {
            sum,
            sum_sq,
            stride,
        }
    }

    /// Sum and squared sum over the `width x height` window at `(x, y)`.
    #[inline]
    pub fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (u64, u64) {
        let s = self.stride;
        let a = y * s + x;
        let b = y * s + x + width;
        let c = (y + height) * s + x;
        let d = (y + height) * s + x + width;
        (
            self.sum[d] + self.sum[a] - self.sum[b] - self.sum[c],
            self.sum_sq[d] + self.sum_sq[a] - self.sum_sq[b] - self.sum_sq[c],
        )
    }
}

/// Dense map of placement scores, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreMap {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

/// Global extrema of a score map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxLoc {
    pub min_value: f32,
    pub max_value: f32,
    /// `(x, y)` of the first minimum in row-major order.
    pub min_loc: (usize, usize),
    /// `(x, y)` of the first maximum in row-major order.
    pub max_loc: (usize, usize),
}

impl ScoreMap {
    pub(crate) fn from_parts(data: Vec<f32>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Number of horizontal placements.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of vertical placements.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Score at placement `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Global minimum and maximum; ties resolve to the first in row-major order.
    pub fn min_max_loc(&self) -> MinMaxLoc {
        let mut out = MinMaxLoc {
            min_value: f32::INFINITY,
            max_value: f32::NEG_INFINITY,
            min_loc: (0, 0),
            max_loc: (0, 0),
        };
        for (idx, &score) in self.data.iter().enumerate() {
            if score < out.min_value {
                out.min_value = score;
                out.min_loc = (idx % self.width, idx / self.width);
            }
            if score > out.max_value {
                out.max_value = score;
                out.max_loc = (idx % self.width, idx / self.width);
            }
        }
        out
    }
}

/// Computes a score map with the compiled-in kernel, optionally row-parallel.
pub fn correlate(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    parallel: bool,
) -> Option<ScoreMap> {
    #[cfg(feature = "rayon")]
    if parallel {
        return self::rayon::score_map_par::<ZnccDefault>(image, plan);
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    <ZnccDefault as Kernel>::score_map(image, plan)
}

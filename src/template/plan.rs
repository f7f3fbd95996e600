//! Zero-mean pattern buffer for normalized cross-correlation.
//!
//! The correlation kernels evaluate
//! `score = sum(t' * I) / sqrt(var_t * var_i)` with `t' = t - mean(t)`,
//! `var_t = sum(t'^2)` and `var_i = sum(I^2) - sum(I)^2 / n`. Only `t'` and
//! `var_t` depend on the pattern, so they are computed here once.

use crate::image::ImageView;

/// Precomputed statistics and zero-mean buffer for one pattern.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f32,
    var_t: f64,
    t_prime_sum: f64,
    t_prime: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a pattern view.
    ///
    /// A flat pattern is accepted; its `var_t` is zero and every placement
    /// scores `0.0`.
    pub fn from_view(tpl: ImageView<'_, u8>) -> Self {
        let width = tpl.width();
        let height = tpl.height();
        let count = width * height;

        let mut sum = 0u64;
        for y in 0..height {
            if let Some(row) = tpl.row(y) {
                sum += row.iter().map(|&v| u64::from(v)).sum::<u64>();
            }
        }
        let mean = sum as f64 / count as f64;

        let mut t_prime = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            if let Some(row) = tpl.row(y) {
                for &value in row {
                    let centered = f64::from(value) - mean;
                    var_t += centered * centered;
                    t_prime.push(centered as f32);
                }
            }
        }

        // Residual of rounding t' to f32; the kernels subtract it so flat and
        // near-flat windows do not pick up a spurious correlation.
        let t_prime_sum = t_prime.iter().map(|&v| f64::from(v)).sum();

        Self {
            width,
            height,
            mean: mean as f32,
            var_t,
            t_prime_sum,
            t_prime,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pattern pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Mean pattern intensity.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Sum of squared deviations from the mean.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }

    /// Sum of the stored zero-mean values (zero up to rounding).
    pub fn t_prime_sum(&self) -> f64 {
        self.t_prime_sum
    }

    /// Zero-mean pattern in row-major order.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }

    /// True when every pixel has the same intensity.
    pub fn is_flat(&self) -> bool {
        self.var_t <= 1e-9
    }
}

//! Plane-to-plane homography: DLT with Hartley normalization, a RANSAC
//! wrapper with a confidence-adaptive iteration budget, and perspective
//! point transforms.

use crate::util::math::cross;
use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Why a homography could not be produced.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HomographyError {
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("source and destination lengths differ: {src} vs {dst}")]
    LengthMismatch { src: usize, dst: usize },
    #[error("no non-degenerate sample reached consensus")]
    NoConsensus,
    #[error("numerical failure: {0}")]
    NumericalFailure(&'static str),
}

/// RANSAC parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacConfig {
    /// Inlier threshold on reprojection error, in pixels.
    pub reproj_threshold: f64,
    /// Iteration budget; shrinks as the inlier ratio grows.
    pub max_iters: usize,
    /// Probability that at least one sample is outlier-free, in `(0, 1)`.
    pub confidence: f64,
    /// Sampler seed; fixed so results are reproducible.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reproj_threshold: 5.0,
            max_iters: 2000,
            confidence: 0.95,
            seed: 0,
        }
    }
}

/// Outcome of a RANSAC fit.
#[derive(Clone, Debug)]
pub struct RansacFit {
    pub h: Matrix3<f64>,
    /// `true` for correspondences within the reprojection threshold.
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
}

const MODEL_POINTS: usize = 4;

/// Projects `(x, y)` through `h`; `None` when the point maps to infinity.
pub fn project(h: &Matrix3<f64>, p: [f64; 2]) -> Option<[f64; 2]> {
    let v = h * Vector3::new(p[0], p[1], 1.0);
    if v[2].abs() <= f64::EPSILON {
        return None;
    }
    Some([v[0] / v[2], v[1] / v[2]])
}

/// Projects every point; points at infinity come back as `NaN`.
pub fn transform_points(h: &Matrix3<f64>, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|&p| project(h, p).unwrap_or([f64::NAN, f64::NAN]))
        .collect()
}

fn reprojection_error_sq(h: &Matrix3<f64>, src: [f64; 2], dst: [f64; 2]) -> f64 {
    match project(h, src) {
        Some(p) => (p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2),
        None => f64::INFINITY,
    }
}

/// Translate the centroid to the origin and scale the mean radius to sqrt(2).
fn normalizing_transform(pts: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    [
        t[(0, 0)] * p[0] + t[(0, 2)],
        t[(1, 1)] * p[1] + t[(1, 2)],
    ]
}

/// Least-squares homography from four or more correspondences.
pub fn estimate_homography_dlt(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Matrix3<f64>, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < MODEL_POINTS {
        return Err(HomographyError::TooFewPoints {
            needed: MODEL_POINTS,
            got: n,
        });
    }

    let t_src = normalizing_transform(src)
        .ok_or(HomographyError::NumericalFailure("coincident source points"))?;
    let t_dst = normalizing_transform(dst)
        .ok_or(HomographyError::NumericalFailure("coincident destination points"))?;

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let [sx, sy] = apply(&t_src, src[i]);
        let [dx, dy] = apply(&t_dst, dst[i]);
        let r = 2 * i;
        a[(r, 3)] = -sx;
        a[(r, 4)] = -sy;
        a[(r, 5)] = -1.0;
        a[(r, 6)] = dy * sx;
        a[(r, 7)] = dy * sy;
        a[(r, 8)] = dy;
        a[(r + 1, 0)] = sx;
        a[(r + 1, 1)] = sy;
        a[(r + 1, 2)] = 1.0;
        a[(r + 1, 6)] = -dx * sx;
        a[(r + 1, 7)] = -dx * sy;
        a[(r + 1, 8)] = -dx;
    }

    // Null vector of A = eigenvector of A^T A with the smallest eigenvalue.
    let eig = SymmetricEigen::new(a.transpose() * &a);
    let min_idx = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.abs().total_cmp(&y.1.abs()))
        .map(|(i, _)| i)
        .ok_or(HomographyError::NumericalFailure("empty eigen decomposition"))?;
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or(HomographyError::NumericalFailure("normalization not invertible"))?;
    let h = t_dst_inv * h_norm * t_src;
    let scale = h[(2, 2)];
    let h = if scale.abs() > 1e-12 { h / scale } else { h };

    if !h.iter().all(|v| v.is_finite()) || h.determinant().abs() <= 1e-12 {
        return Err(HomographyError::NumericalFailure("singular homography"));
    }
    Ok(h)
}

/// Rejects minimal samples with collinear points or a mirrored layout.
fn sample_is_valid(src: &[[f64; 2]; MODEL_POINTS], dst: &[[f64; 2]; MODEL_POINTS]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [1, 2, 3], [0, 2, 3], [0, 1, 3]];
    let mut negative = 0;
    for [i, j, k] in TRIPLES {
        let cs = cross(src[i], src[j], src[k]);
        let cd = cross(dst[i], dst[j], dst[k]);
        if cs.abs() <= 1e-9 || cd.abs() <= 1e-9 {
            return false;
        }
        if cs * cd < 0.0 {
            negative += 1;
        }
    }
    negative == 0 || negative == TRIPLES.len()
}

/// Iterations needed to draw one outlier-free sample with probability
/// `confidence`, given an outlier ratio; capped at `max_iters`.
fn update_num_iters(confidence: f64, outlier_ratio: f64, max_iters: usize) -> usize {
    let ep = outlier_ratio.clamp(0.0, 1.0);
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - (1.0 - ep).powi(MODEL_POINTS as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let num = num.ln();
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        max_iters
    } else {
        (num / denom).round() as usize
    }
}

/// Fits a homography robust to outlying correspondences.
///
/// Minimal four-point samples are drawn with a seeded RNG; the winning model
/// is refit by DLT on all of its inliers.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    cfg: &RansacConfig,
) -> Result<RansacFit, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < MODEL_POINTS {
        return Err(HomographyError::TooFewPoints {
            needed: MODEL_POINTS,
            got: n,
        });
    }

    let threshold_sq = cfg.reproj_threshold * cfg.reproj_threshold;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
    let mut budget = cfg.max_iters;
    let mut iter = 0;

    while iter < budget {
        iter += 1;
        let picks = rand::seq::index::sample(&mut rng, n, MODEL_POINTS);
        let mut s = [[0.0; 2]; MODEL_POINTS];
        let mut d = [[0.0; 2]; MODEL_POINTS];
        for (slot, idx) in picks.iter().enumerate() {
            s[slot] = src[idx];
            d[slot] = dst[idx];
        }
        if !sample_is_valid(&s, &d) {
            continue;
        }
        let Ok(h) = estimate_homography_dlt(&s, &d) else {
            continue;
        };

        let mask: Vec<bool> = src
            .iter()
            .zip(dst)
            .map(|(&a, &b)| reprojection_error_sq(&h, a, b) <= threshold_sq)
            .collect();
        let count = mask.iter().filter(|&&m| m).count();
        if best.as_ref().map_or(true, |b| count > b.2) {
            budget = budget.min(update_num_iters(
                cfg.confidence,
                (n - count) as f64 / n as f64,
                cfg.max_iters,
            ));
            best = Some((h, mask, count));
        }
    }

    let (h, inlier_mask, n_inliers) = best.ok_or(HomographyError::NoConsensus)?;
    if n_inliers < MODEL_POINTS {
        return Err(HomographyError::NoConsensus);
    }

    let h = if n_inliers > MODEL_POINTS {
        let (in_src, in_dst): (Vec<_>, Vec<_>) = src
            .iter()
            .zip(dst)
            .zip(&inlier_mask)
            .filter(|(_, m)| **m)
            .map(|((&a, &b), _)| (a, b))
            .unzip();
        estimate_homography_dlt(&in_src, &in_dst).unwrap_or(h)
    } else {
        h
    };

    Ok(RansacFit {
        h,
        inlier_mask,
        n_inliers,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        estimate_homography_dlt, fit_homography_ransac, project, transform_points,
        update_num_iters, HomographyError, RansacConfig,
    };
    use nalgebra::Matrix3;

    fn truth() -> Matrix3<f64> {
        Matrix3::new(0.9, -0.2, 40.0, 0.15, 1.1, 25.0, 1e-4, -2e-4, 1.0)
    }

    fn grid() -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for y in 0..4 {
            for x in 0..5 {
                pts.push([x as f64 * 17.0 + 3.0, y as f64 * 13.0 + 5.0]);
            }
        }
        pts
    }

    #[test]
    fn dlt_recovers_exact_homography() {
        let h = truth();
        let src = grid();
        let dst = transform_points(&h, &src);
        let est = estimate_homography_dlt(&src, &dst).unwrap();
        for p in &src {
            let a = project(&h, *p).unwrap();
            let b = project(&est, *p).unwrap();
            assert!((a[0] - b[0]).abs() < 1e-6 && (a[1] - b[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn ransac_ignores_gross_outliers() {
        let h = truth();
        let src = grid();
        let mut dst = transform_points(&h, &src);
        dst[3] = [500.0, -40.0];
        dst[11] = [-90.0, 300.0];
        dst[17] = [0.0, 0.0];

        let fit = fit_homography_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(fit.n_inliers, src.len() - 3);
        assert!(!fit.inlier_mask[3] && !fit.inlier_mask[11] && !fit.inlier_mask[17]);
        let p = project(&fit.h, [30.0, 30.0]).unwrap();
        let q = project(&h, [30.0, 30.0]).unwrap();
        assert!((p[0] - q[0]).abs() < 1e-3 && (p[1] - q[1]).abs() < 1e-3);
    }

    #[test]
    fn ransac_rejects_too_few_and_collinear_points() {
        let cfg = RansacConfig::default();
        let three = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            fit_homography_ransac(&three, &three, &cfg).unwrap_err(),
            HomographyError::TooFewPoints { needed: 4, got: 3 }
        );

        let line: Vec<[f64; 2]> = (0..6).map(|i| [i as f64, 2.0 * i as f64]).collect();
        assert_eq!(
            fit_homography_ransac(&line, &line, &RansacConfig { max_iters: 50, ..cfg })
                .unwrap_err(),
            HomographyError::NoConsensus
        );
    }

    #[test]
    fn iteration_budget_shrinks_with_inlier_ratio() {
        assert_eq!(update_num_iters(0.95, 0.0, 2000), 0);
        let half = update_num_iters(0.95, 0.5, 2000);
        assert!(half > 0 && half < 2000);
        assert_eq!(update_num_iters(0.95, 0.99, 2000), 2000);
    }
}

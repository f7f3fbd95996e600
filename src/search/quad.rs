//! Maps the pattern outline into the scene through a fitted homography.

use crate::geometry::{Point, Quad, Size};
use crate::homography::{fit_homography_ransac, transform_points, HomographyError, RansacConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::math::trunc_to_i32;

/// Projected pattern outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadEstimate {
    /// Corner order `top_left, bottom_left, bottom_right, top_right`; the
    /// match center is `quad.center()`.
    pub quad: Quad,
    /// Correspondences consistent with the fitted homography.
    pub inliers: usize,
}

/// Fits a homography from pattern to scene points and projects the pattern
/// corners `(0,0)`, `(0,h-1)`, `(w-1,h-1)`, `(w-1,0)` through it.
///
/// Projected corners are truncated toward zero.
pub fn estimate_quad(
    size: Size,
    pattern_points: &[[f64; 2]],
    scene_points: &[[f64; 2]],
    cfg: &RansacConfig,
) -> Result<QuadEstimate, HomographyError> {
    let _span = trace_span!("estimate_quad", points = pattern_points.len()).entered();

    let fit = fit_homography_ransac(pattern_points, scene_points, cfg)?;
    trace_event!("ransac_inliers", inliers = fit.n_inliers);

    let w = size.width.saturating_sub(1) as f64;
    let h = size.height.saturating_sub(1) as f64;
    let corners = transform_points(&fit.h, &[[0.0, 0.0], [0.0, h], [w, h], [w, 0.0]]);
    if corners.iter().flatten().any(|v| !v.is_finite()) {
        return Err(HomographyError::NumericalFailure("corner projected to infinity"));
    }
    let [c0, c1, c2, c3] = [0, 1, 2, 3].map(|i| {
        Point::new(trunc_to_i32(corners[i][0]), trunc_to_i32(corners[i][1]))
    });

    let quad = Quad {
        top_left: c0,
        bottom_left: c1,
        bottom_right: c2,
        top_right: c3,
    };
    Ok(QuadEstimate {
        quad,
        inliers: fit.n_inliers,
    })
}

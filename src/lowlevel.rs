//! Building blocks for custom matching pipelines.
//!
//! Most users should prefer [`crate::Finder`]. These re-exports expose the
//! individual locators, kernels and primitives for callers that need to run
//! a single stage or swap one out.

pub use crate::features::{
    dedup_by_scene_point, hamming, knn_match, ratio_test, Correspondence, Descriptor, Neighbor,
};
pub use crate::homography::{
    estimate_homography_dlt, fit_homography_ransac, project, transform_points, RansacFit,
};
pub use crate::image::pyramid::{ImagePyramid, PyramidLevel};
pub use crate::kernel::scalar::ZnccScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::ZnccSimd;
pub use crate::kernel::{correlate, Kernel, ScoreMap, WindowSums};
pub use crate::search::{
    estimate_quad, fill_quad, locate_by_features, locate_by_features_gray, locate_exact,
    locate_exact_gray, QuadEstimate, WorkingScene, SUPPRESSION_FILL,
};
pub use crate::template::TemplatePlan;

//! Keypoint-based fallback locator.
//!
//! Tolerates scale and perspective changes the exact loop cannot: pattern
//! keypoints are matched to scene keypoints, filtered, and either reported
//! as a single point or turned into a projected outline.

use crate::features::{
    dedup_by_scene_point, knn_match, ratio_test, Correspondence, FeatureDetector, Features,
};
use crate::geometry::{MatchResult, Point, Size};
use crate::homography::RansacConfig;
use crate::image::gray::to_grayscale;
use crate::image::{ColorView, ImageView};
use crate::search::quad::estimate_quad;
use crate::search::validate_pair;
use crate::trace::{trace_event, trace_span};
use crate::util::math::trunc_to_i32;
use crate::util::{SceneMatchError, SceneMatchResult};

/// Parameters of the feature locator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureConfig {
    /// Nearest/second-nearest distance ratio a correspondence must beat.
    pub ratio: f32,
    /// Minimum number of pattern keypoints.
    pub min_match: usize,
    pub homography: RansacConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            ratio: 0.75,
            min_match: 4,
            homography: RansacConfig::default(),
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> SceneMatchResult<()> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(SceneMatchError::InvalidConfig {
                reason: "ratio must be in (0, 1]",
            });
        }
        let c = self.homography.confidence;
        if !(c > 0.0 && c < 1.0) {
            return Err(SceneMatchError::InvalidConfig {
                reason: "confidence must be in (0, 1)",
            });
        }
        if !(self.homography.reproj_threshold > 0.0) {
            return Err(SceneMatchError::InvalidConfig {
                reason: "reprojection threshold must be positive",
            });
        }
        Ok(())
    }
}

/// Converts both images to grayscale and runs the feature locator.
pub fn locate_by_features<D: FeatureDetector + ?Sized>(
    scene: ColorView<'_>,
    pattern: ColorView<'_>,
    cfg: &FeatureConfig,
    detector: &D,
) -> SceneMatchResult<Vec<MatchResult>> {
    validate_pair(scene, pattern)?;
    let scene_gray = to_grayscale(scene);
    let pattern_gray = to_grayscale(pattern);
    locate_by_features_gray(scene_gray.view(), pattern_gray.view(), cfg, detector)
}

/// Feature locator over grayscale inputs. Returns at most one match.
///
/// Too few keypoints, no surviving correspondence and homography failure all
/// produce an empty list; only invalid configuration and detector errors
/// are reported.
pub fn locate_by_features_gray<D: FeatureDetector + ?Sized>(
    scene: ImageView<'_, u8>,
    pattern: ImageView<'_, u8>,
    cfg: &FeatureConfig,
    detector: &D,
) -> SceneMatchResult<Vec<MatchResult>> {
    cfg.validate()?;
    let _span = trace_span!("locate_by_features").entered();

    let size = Size::new(pattern.width(), pattern.height());
    let pattern_features = detector.detect(pattern)?;
    let scene_features = detector.detect(scene)?;
    trace_event!(
        "keypoints",
        pattern = pattern_features.len(),
        scene = scene_features.len()
    );
    if pattern_features.len() < 2
        || scene_features.len() < 2
        || pattern_features.len() < cfg.min_match
    {
        return Ok(Vec::new());
    }

    let good = correspondences(&pattern_features, &scene_features, cfg.ratio);
    trace_event!("correspondences", count = good.len());

    match good.as_slice() {
        [] => Ok(Vec::new()),
        [only] => {
            let kp = scene_features.keypoints[only.train];
            let center = Point::new(
                trunc_to_i32(f64::from(kp.x)),
                trunc_to_i32(f64::from(kp.y)),
            );
            Ok(vec![MatchResult::single_feature(center, size)])
        }
        _ => {
            let point = |kp: &crate::features::Keypoint| [f64::from(kp.x), f64::from(kp.y)];
            let src: Vec<[f64; 2]> = good
                .iter()
                .map(|c| point(&pattern_features.keypoints[c.query]))
                .collect();
            let dst: Vec<[f64; 2]> = good
                .iter()
                .map(|c| point(&scene_features.keypoints[c.train]))
                .collect();
            match estimate_quad(size, &src, &dst, &cfg.homography) {
                Ok(est) => {
                    trace_event!(
                        "quad_estimated",
                        inliers = est.inliers,
                        correspondences = good.len()
                    );
                    Ok(vec![MatchResult::homography(est.quad, size, good.len())])
                }
                Err(_err) => {
                    trace_event!("homography_failed", reason = _err.to_string());
                    Ok(Vec::new())
                }
            }
        }
    }
}

/// Ratio-tested, scene-point-deduplicated correspondences in pattern order.
fn correspondences(pattern: &Features, scene: &Features, ratio: f32) -> Vec<Correspondence> {
    let neighbors = knn_match(&pattern.descriptors, &scene.descriptors, 2);
    dedup_by_scene_point(ratio_test(&neighbors, ratio), &scene.keypoints)
}

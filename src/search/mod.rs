//! Match orchestration.
//!
//! [`Finder`] runs the exact ZNCC loop first and falls back to keypoint
//! matching only when the exact loop finds nothing. The two result lists are
//! never merged.

pub mod exact;
pub mod feature;
pub mod quad;
pub mod suppress;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::features::{FeatureDetector, OrbDetector};
use crate::geometry::{MatchResult, Point};
use crate::image::gray::to_grayscale;
use crate::image::{ColorView, ImageView};
use crate::kernel::{correlate, MinMaxLoc};
use crate::template::TemplatePlan;
use crate::trace::{trace_event, trace_span};
use crate::util::{SceneMatchError, SceneMatchResult};

pub use exact::{locate_exact, locate_exact_gray, ExactConfig};
pub use feature::{locate_by_features, locate_by_features_gray, FeatureConfig};
pub use quad::{estimate_quad, QuadEstimate};
pub use suppress::{fill_quad, WorkingScene, SUPPRESSION_FILL};

/// Scene and pattern must share a channel layout.
pub(crate) fn validate_pair(scene: ColorView<'_>, pattern: ColorView<'_>) -> SceneMatchResult<()> {
    if scene.channels() != pattern.channels() {
        return Err(SceneMatchError::ChannelMismatch {
            scene: scene.channels().count(),
            pattern: pattern.channels().count(),
        });
    }
    Ok(())
}

/// Configuration for [`Finder`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FindConfig {
    pub exact: ExactConfig,
    pub features: FeatureConfig,
    /// Run the feature locator when the exact loop returns nothing.
    pub feature_fallback: bool,
}

impl Default for FindConfig {
    fn default() -> Self {
        Self {
            exact: ExactConfig::default(),
            features: FeatureConfig::default(),
            feature_fallback: true,
        }
    }
}

impl FindConfig {
    pub fn validate(&self) -> SceneMatchResult<()> {
        self.exact.validate()?;
        self.features.validate()
    }
}

/// Pattern finder combining the exact and feature locators.
#[derive(Clone, Debug)]
pub struct Finder<D = OrbDetector> {
    cfg: FindConfig,
    detector: D,
}

impl Default for Finder<OrbDetector> {
    fn default() -> Self {
        Self::new()
    }
}

impl Finder<OrbDetector> {
    /// Finder with default configuration and the ORB detector.
    pub fn new() -> Self {
        Self::with_detector(OrbDetector::default())
    }
}

impl<D: FeatureDetector> Finder<D> {
    /// Finder with default configuration and a custom feature detector.
    pub fn with_detector(detector: D) -> Self {
        Self {
            cfg: FindConfig::default(),
            detector,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: FindConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn config(&self) -> &FindConfig {
        &self.cfg
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// All instances of `pattern` in `scene`.
    ///
    /// Exact matches when there are any; otherwise the feature locator's
    /// result (at most one match) if fallback is enabled.
    pub fn find(
        &self,
        scene: ColorView<'_>,
        pattern: ColorView<'_>,
    ) -> SceneMatchResult<Vec<MatchResult>> {
        self.cfg.validate()?;
        validate_pair(scene, pattern)?;
        let scene_gray = to_grayscale(scene);
        let pattern_gray = to_grayscale(pattern);
        self.find_gray(scene_gray.view(), pattern_gray.view())
    }

    /// Exact-match loop only; never falls back.
    pub fn find_exact(
        &self,
        scene: ColorView<'_>,
        pattern: ColorView<'_>,
    ) -> SceneMatchResult<Vec<MatchResult>> {
        self.cfg.validate()?;
        locate_exact(scene, pattern, &self.cfg.exact)
    }

    /// First result of [`Finder::find`].
    pub fn find_first(
        &self,
        scene: ColorView<'_>,
        pattern: ColorView<'_>,
    ) -> SceneMatchResult<Option<MatchResult>> {
        Ok(self.find(scene, pattern)?.into_iter().next())
    }

    /// Center of the first result.
    pub fn find_center(
        &self,
        scene: ColorView<'_>,
        pattern: ColorView<'_>,
    ) -> SceneMatchResult<Option<Point>> {
        Ok(self.find_first(scene, pattern)?.map(|m| m.center))
    }

    /// Centers of all results.
    pub fn find_all_centers(
        &self,
        scene: ColorView<'_>,
        pattern: ColorView<'_>,
    ) -> SceneMatchResult<Vec<Point>> {
        Ok(self
            .find(scene, pattern)?
            .into_iter()
            .map(|m| m.center)
            .collect())
    }

    /// One result list per pattern, in pattern order.
    ///
    /// The scene is converted to grayscale once; every pattern gets its own
    /// working copy. With the `rayon` feature and `exact.parallel` set the
    /// patterns are searched concurrently.
    pub fn find_multi(
        &self,
        scene: ColorView<'_>,
        patterns: &[ColorView<'_>],
    ) -> SceneMatchResult<Vec<Vec<MatchResult>>> {
        self.cfg.validate()?;
        for pattern in patterns {
            validate_pair(scene, *pattern)?;
        }
        let _span = trace_span!("find_multi", patterns = patterns.len()).entered();
        let scene_gray = to_grayscale(scene);

        let search = |pattern: &ColorView<'_>| {
            let pattern_gray = to_grayscale(*pattern);
            self.find_gray(scene_gray.view(), pattern_gray.view())
        };

        #[cfg(feature = "rayon")]
        if self.cfg.exact.parallel {
            return patterns.par_iter().map(search).collect();
        }
        patterns.iter().map(search).collect()
    }

    /// Raw extrema of a single correlation pass, without suppression.
    ///
    /// `None` when the pattern does not fit inside the scene.
    pub fn best_match(
        &self,
        scene: ColorView<'_>,
        pattern: ColorView<'_>,
    ) -> SceneMatchResult<Option<MinMaxLoc>> {
        validate_pair(scene, pattern)?;
        let scene_gray = to_grayscale(scene);
        let pattern_gray = to_grayscale(pattern);
        let plan = TemplatePlan::from_view(pattern_gray.view());
        Ok(correlate(scene_gray.view(), &plan, self.cfg.exact.parallel)
            .map(|map| map.min_max_loc()))
    }

    fn find_gray(
        &self,
        scene: ImageView<'_, u8>,
        pattern: ImageView<'_, u8>,
    ) -> SceneMatchResult<Vec<MatchResult>> {
        let _span = trace_span!("find").entered();
        let exact = locate_exact_gray(scene, pattern, &self.cfg.exact);
        if !exact.is_empty() || !self.cfg.feature_fallback {
            return Ok(exact);
        }
        trace_event!("feature_fallback", pattern_w = pattern.width());
        locate_by_features_gray(scene, pattern, &self.cfg.features, &self.detector)
    }
}

#[cfg(test)]
mod tests {
    use super::{FindConfig, Finder};
    use crate::features::{FeatureDetector, Features, Keypoint};
    use crate::geometry::{MatchKind, Point};
    use crate::image::{ColorView, ImageView};
    use crate::util::{SceneMatchError, SceneMatchResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and reports one keypoint pair that always matches.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl FeatureDetector for Counting {
        fn detect(&self, _image: ImageView<'_, u8>) -> SceneMatchResult<Features> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let kp = |x| Keypoint {
                x,
                y: 7.0,
                angle: 0.0,
                response: 1.0,
                octave: 0,
            };
            Ok(Features {
                keypoints: vec![kp(3.0), kp(9.0), kp(15.0), kp(21.0)],
                descriptors: vec![[0x00; 32], [0xFF; 32], [0xF0; 32], [0x0F; 32]],
            })
        }
    }

    fn textured(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                ((x * 37) ^ (y * 11) ^ (x * y)) as u8
            })
            .collect()
    }

    fn paste(scene: &mut [u8], scene_w: usize, pattern: &[u8], w: usize, ox: usize, oy: usize) {
        for (y, row) in pattern.chunks(w).enumerate() {
            let start = (oy + y) * scene_w + ox;
            scene[start..start + w].copy_from_slice(row);
        }
    }

    #[test]
    fn exact_hit_skips_fallback() {
        let pattern = textured(9, 7);
        let mut scene = vec![0u8; 40 * 30];
        paste(&mut scene, 40, &pattern, 9, 17, 11);

        let finder = Finder::with_detector(Counting::default());
        let out = finder
            .find(
                ColorView::gray(&scene, 40, 30).unwrap(),
                ColorView::gray(&pattern, 9, 7).unwrap(),
            )
            .unwrap();
        assert_eq!(out[0].top_left, Point::new(17, 11));
        assert!(matches!(out[0].kind, MatchKind::Exact { .. }));
        assert_eq!(finder.detector().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_exact_result_falls_back_once() {
        let pattern = textured(9, 7);
        let scene = vec![50u8; 40 * 30];
        let scene_view = ColorView::gray(&scene, 40, 30).unwrap();
        let pattern_view = ColorView::gray(&pattern, 9, 7).unwrap();

        let finder = Finder::with_detector(Counting::default());
        let out = finder.find(scene_view, pattern_view).unwrap();
        assert_eq!(finder.detector().calls.load(Ordering::SeqCst), 2);
        // Every descriptor is its own exact neighbour; four keypoints on one
        // line cannot support a homography.
        assert!(out.is_empty());

        let no_fallback = Finder::with_detector(Counting::default()).with_config(FindConfig {
            feature_fallback: false,
            ..FindConfig::default()
        });
        assert!(no_fallback.find(scene_view, pattern_view).unwrap().is_empty());
        assert_eq!(no_fallback.detector().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let gray = vec![0u8; 16];
        let rgb = vec![0u8; 48];
        let finder = Finder::new();
        let err = finder
            .find(
                ColorView::rgb(&rgb, 4, 4).unwrap(),
                ColorView::gray(&gray, 4, 4).unwrap(),
            )
            .unwrap_err();
        assert_eq!(err, SceneMatchError::ChannelMismatch { scene: 3, pattern: 1 });
    }

    #[test]
    fn multi_keeps_pattern_order() {
        let a = textured(6, 5);
        let b: Vec<u8> = textured(6, 5).iter().map(|v| v.wrapping_mul(3) ^ 0x5A).collect();
        let mut scene = vec![0u8; 50 * 20];
        paste(&mut scene, 50, &a, 6, 30, 4);
        paste(&mut scene, 50, &b, 6, 5, 9);

        let finder = Finder::new().with_config(FindConfig {
            feature_fallback: false,
            ..FindConfig::default()
        });
        let out = finder
            .find_multi(
                ColorView::gray(&scene, 50, 20).unwrap(),
                &[
                    ColorView::gray(&a, 6, 5).unwrap(),
                    ColorView::gray(&b, 6, 5).unwrap(),
                ],
            )
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][0].top_left, Point::new(30, 4));
        assert_eq!(out[1][0].top_left, Point::new(5, 9));
    }

    #[test]
    fn best_match_reports_raw_extrema() {
        let pattern = textured(5, 4);
        let mut scene = vec![0u8; 20 * 12];
        paste(&mut scene, 20, &pattern, 5, 8, 3);
        let mm = Finder::new()
            .best_match(
                ColorView::gray(&scene, 20, 12).unwrap(),
                ColorView::gray(&pattern, 5, 4).unwrap(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(mm.max_loc, (8, 3));
        assert!((mm.max_value - 1.0).abs() < 1e-4);

        let tiny = vec![0u8; 4];
        assert!(Finder::new()
            .best_match(
                ColorView::gray(&tiny, 2, 2).unwrap(),
                ColorView::gray(&pattern, 5, 4).unwrap(),
            )
            .unwrap()
            .is_none());
    }
}

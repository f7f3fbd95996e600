//! Iterative exact-match locator.
//!
//! Each pass computes the full ZNCC score map over the working scene, records
//! the best placement and suppresses it, until the best score drops below
//! the threshold or the count bound trips.

use crate::geometry::{MatchResult, Point, Size};
use crate::image::gray::to_grayscale;
use crate::image::ColorView;
use crate::kernel::correlate;
use crate::search::suppress::WorkingScene;
use crate::search::validate_pair;
use crate::template::TemplatePlan;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{SceneMatchError, SceneMatchResult};
use crate::ImageView;

/// Parameters of the exact-match loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExactConfig {
    /// Minimum correlation score for a match, on the `[-1, 1]` ZNCC scale.
    pub threshold: f32,
    /// Count bound. The test runs before each new match is recorded, so up to
    /// `max_count + 1` matches can be returned.
    pub max_count: usize,
    /// Report the score map minimum instead of the maximum (inverted
    /// patterns). The threshold test still reads the maximum.
    pub use_min_score: bool,
    /// Compute score maps row-parallel (needs the `rayon` feature).
    pub parallel: bool,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_count: 10,
            use_min_score: false,
            parallel: false,
        }
    }
}

impl ExactConfig {
    /// Rejects a non-finite threshold.
    pub fn validate(&self) -> SceneMatchResult<()> {
        if !self.threshold.is_finite() {
            return Err(SceneMatchError::InvalidConfig {
                reason: "threshold must be finite",
            });
        }
        Ok(())
    }
}

/// Converts both images to grayscale and runs the exact-match loop.
pub fn locate_exact(
    scene: ColorView<'_>,
    pattern: ColorView<'_>,
    cfg: &ExactConfig,
) -> SceneMatchResult<Vec<MatchResult>> {
    cfg.validate()?;
    validate_pair(scene, pattern)?;
    let scene_gray = to_grayscale(scene);
    let pattern_gray = to_grayscale(pattern);
    Ok(locate_exact_gray(scene_gray.view(), pattern_gray.view(), cfg))
}

/// Exact-match loop over grayscale inputs.
///
/// `scene` is copied into a private working buffer before anything is
/// suppressed. A pattern larger than the scene has no placement and yields
/// an empty list. The loop also ends when the chosen placement is a flat
/// window, which covers suppressed regions under a non-positive threshold;
/// a NaN threshold never passes the gate.
pub fn locate_exact_gray(
    scene: ImageView<'_, u8>,
    pattern: ImageView<'_, u8>,
    cfg: &ExactConfig,
) -> Vec<MatchResult> {
    let _span = trace_span!(
        "locate_exact",
        scene_w = scene.width(),
        scene_h = scene.height(),
        pattern_w = pattern.width(),
        pattern_h = pattern.height()
    )
    .entered();

    let plan = TemplatePlan::from_view(pattern);
    let size = Size::new(pattern.width(), pattern.height());
    let mut work = WorkingScene::from_view(scene);
    let mut results = Vec::new();

    loop {
        let Some(map) = correlate(work.view(), &plan, cfg.parallel) else {
            break;
        };
        let mm = map.min_max_loc();
        if !(mm.max_value >= cfg.threshold) || results.len() > cfg.max_count {
            break;
        }

        let ((x, y), confidence) = if cfg.use_min_score {
            (mm.min_loc, mm.min_value)
        } else {
            (mm.max_loc, mm.max_value)
        };
        trace_debug!("exact_peak", x = x, y = y, score = confidence);
        if window_is_flat(work.view(), x, y, size) {
            break;
        }

        let found = MatchResult::exact(Point::new(x as i32, y as i32), size, confidence);
        if let Some(quad) = found.quad.as_ref() {
            work.suppress(quad);
        }
        results.push(found);
    }

    trace_event!("exact_matches", count = results.len());
    results
}

fn window_is_flat(image: ImageView<'_, u8>, x: usize, y: usize, size: Size) -> bool {
    let Some(&first) = image.get(x, y) else {
        return true;
    };
    (y..y + size.height).all(|row| {
        image
            .row(row)
            .and_then(|r| r.get(x..x + size.width))
            .is_some_and(|r| r.iter().all(|&v| v == first))
    })
}

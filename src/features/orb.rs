//! ORB-style detector: FAST-9 corners on an octave pyramid, grid
//! non-maximum suppression, intensity-centroid orientation and steered
//! 256-bit BRIEF descriptors.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Descriptor, FeatureDetector, Features, Keypoint};
use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::trace::trace_debug;
use crate::util::SceneMatchResult;

/// Bresenham circle of radius 3, clockwise from the top.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];
const ARC: usize = 9;
const BORDER: usize = 3;
const PATCH_RADIUS: i64 = 15;
const BRIEF_RADIUS: i32 = 13;
const DESCRIPTOR_BITS: usize = 256;

/// Detector parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbConfig {
    /// Intensity difference a circle pixel needs to count as brighter/darker.
    pub fast_threshold: u8,
    /// Keypoints kept across all levels, strongest first.
    pub max_keypoints: usize,
    /// Pyramid levels including the base.
    pub levels: usize,
    /// Smallest side a pyramid level may have.
    pub min_level_side: usize,
    /// Grid cell size for non-maximum suppression, in level pixels.
    pub nms_cell: usize,
    /// Seed of the BRIEF sampling pattern.
    pub pattern_seed: u64,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 500,
            levels: 3,
            min_level_side: 32,
            nms_cell: 5,
            pattern_seed: 0x0b1e_f00d,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Corner {
    x: usize,
    y: usize,
    response: f32,
}

/// ORB detector with a fixed BRIEF test pattern.
#[derive(Clone, Debug)]
pub struct OrbDetector {
    cfg: OrbConfig,
    pairs: Vec<[i8; 4]>,
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self::new(OrbConfig::default())
    }
}

impl OrbDetector {
    /// Builds the detector and draws its BRIEF pattern from `cfg.pattern_seed`.
    pub fn new(cfg: OrbConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.pattern_seed);
        let mut pairs = Vec::with_capacity(DESCRIPTOR_BITS);
        while pairs.len() < DESCRIPTOR_BITS {
            let pair: [i8; 4] =
                std::array::from_fn(|_| rng.random_range(-BRIEF_RADIUS..=BRIEF_RADIUS) as i8);
            if pair[..2] != pair[2..] {
                pairs.push(pair);
            }
        }
        Self { cfg, pairs }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    fn describe(&self, image: ImageView<'_, u8>, x: usize, y: usize, angle: f32) -> Descriptor {
        let (sin, cos) = angle.sin_cos();
        let steer = |dx: i8, dy: i8| -> (i64, i64) {
            let (dx, dy) = (f32::from(dx), f32::from(dy));
            (
                x as i64 + (dx * cos - dy * sin).round() as i64,
                y as i64 + (dx * sin + dy * cos).round() as i64,
            )
        };

        let mut desc = [0u8; 32];
        for (bit, &[x1, y1, x2, y2]) in self.pairs.iter().enumerate() {
            let (ax, ay) = steer(x1, y1);
            let (bx, by) = steer(x2, y2);
            if image.clamped(ax, ay) < image.clamped(bx, by) {
                desc[bit / 8] |= 1 << (bit % 8);
            }
        }
        desc
    }
}

impl FeatureDetector for OrbDetector {
    fn detect(&self, image: ImageView<'_, u8>) -> SceneMatchResult<Features> {
        let pyramid = ImagePyramid::build(image, self.cfg.levels, self.cfg.min_level_side);
        let mut found: Vec<(Keypoint, Descriptor)> = Vec::new();

        for (octave, level) in pyramid.levels().iter().enumerate() {
            let view = level.image.view();
            let corners = fast_corners(view, self.cfg.fast_threshold);
            let corners = grid_nms(corners, self.cfg.nms_cell, self.cfg.max_keypoints);
            trace_debug!("orb_level", octave = octave, corners = corners.len());

            for c in corners {
                let angle = orientation(view, c.x, c.y);
                let kp = Keypoint {
                    x: (c.x as f32 + 0.5) * level.scale - 0.5,
                    y: (c.y as f32 + 0.5) * level.scale - 0.5,
                    angle,
                    response: c.response,
                    octave: octave as u8,
                };
                found.push((kp, self.describe(view, c.x, c.y, angle)));
            }
        }

        found.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
        found.truncate(self.cfg.max_keypoints);
        let (keypoints, descriptors) = found.into_iter().unzip();
        Ok(Features {
            keypoints,
            descriptors,
        })
    }
}

/// FAST-9 segment test over every pixel at least `BORDER` from the edge.
///
/// The response is the summed excess contrast of the circle pixels that
/// pass the threshold.
fn fast_corners(image: ImageView<'_, u8>, threshold: u8) -> Vec<Corner> {
    let (width, height) = (image.width(), image.height());
    let mut corners = Vec::new();
    if width <= 2 * BORDER || height <= 2 * BORDER {
        return corners;
    }
    let t = i16::from(threshold);

    for y in BORDER..height - BORDER {
        let rows: Vec<&[u8]> = (y - BORDER..=y + BORDER)
            .filter_map(|r| image.row(r))
            .collect();
        if rows.len() != 2 * BORDER + 1 {
            continue;
        }
        for x in BORDER..width - BORDER {
            let center = i16::from(rows[BORDER][x]);
            let ring: [i16; 16] = std::array::from_fn(|i| {
                let (dx, dy) = CIRCLE[i];
                let row = rows[(BORDER as i32 + dy) as usize];
                i16::from(row[(x as i32 + dx) as usize])
            });

            // A 9-arc always covers at least two of the four compass points.
            let compass = [ring[0], ring[4], ring[8], ring[12]];
            let bright = compass.iter().filter(|&&p| p > center + t).count();
            let dark = compass.iter().filter(|&&p| p < center - t).count();
            if bright < 2 && dark < 2 {
                continue;
            }

            if has_arc(&ring, |p| p > center + t) || has_arc(&ring, |p| p < center - t) {
                let response = ring
                    .iter()
                    .map(|&p| ((p - center).abs() - t).max(0) as f32)
                    .sum();
                corners.push(Corner { x, y, response });
            }
        }
    }
    corners
}

fn has_arc(ring: &[i16; 16], pass: impl Fn(i16) -> bool) -> bool {
    let mut run = 0;
    for i in 0..ring.len() + ARC - 1 {
        if pass(ring[i % ring.len()]) {
            run += 1;
            if run >= ARC {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Greedy suppression on a coarse grid: strongest corners first, each one
/// blocking its own cell and the eight around it.
fn grid_nms(mut corners: Vec<Corner>, cell: usize, limit: usize) -> Vec<Corner> {
    let cell = cell.max(1);
    corners.sort_by(|a, b| b.response.total_cmp(&a.response));

    let mut taken: HashSet<(i64, i64)> = HashSet::new();
    let mut kept = Vec::new();
    for c in corners {
        if kept.len() >= limit {
            break;
        }
        let gx = (c.x / cell) as i64;
        let gy = (c.y / cell) as i64;
        let blocked = (-1..=1).any(|dy| (-1..=1).any(|dx| taken.contains(&(gx + dx, gy + dy))));
        if !blocked {
            taken.insert((gx, gy));
            kept.push(c);
        }
    }
    kept
}

/// Angle of the intensity centroid within a disc of radius `PATCH_RADIUS`.
fn orientation(image: ImageView<'_, u8>, x: usize, y: usize) -> f32 {
    let (cx, cy) = (x as i64, y as i64);
    let mut m01 = 0i64;
    let mut m10 = 0i64;
    for dy in -PATCH_RADIUS..=PATCH_RADIUS {
        for dx in -PATCH_RADIUS..=PATCH_RADIUS {
            if dx * dx + dy * dy > PATCH_RADIUS * PATCH_RADIUS {
                continue;
            }
            let v = i64::from(image.clamped(cx + dx, cy + dy));
            m10 += v * dx;
            m01 += v * dy;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}

#[cfg(test)]
mod tests {
    use super::{fast_corners, grid_nms, has_arc, Corner, OrbConfig, OrbDetector};
    use crate::features::FeatureDetector;
    use crate::image::ImageView;

    fn square(width: usize, height: usize) -> Vec<u8> {
        let mut data = vec![20u8; width * height];
        for y in 8..20 {
            for x in 8..20 {
                data[y * width + x] = 220;
            }
        }
        data
    }

    #[test]
    fn arc_detection_wraps_around() {
        let mut ring = [0i16; 16];
        for i in [12, 13, 14, 15, 0, 1, 2, 3, 4] {
            ring[i] = 100;
        }
        assert!(has_arc(&ring, |p| p > 50));
        ring[14] = 0;
        assert!(!has_arc(&ring, |p| p > 50));
    }

    #[test]
    fn fast_fires_on_square_corners_only() {
        let data = square(28, 28);
        let view = ImageView::from_slice(&data, 28, 28).unwrap();
        let corners = fast_corners(view, 20);
        assert!(!corners.is_empty());
        for c in &corners {
            let near_x = c.x.abs_diff(8) <= 2 || c.x.abs_diff(19) <= 2;
            let near_y = c.y.abs_diff(8) <= 2 || c.y.abs_diff(19) <= 2;
            assert!(near_x && near_y, "unexpected corner at {},{}", c.x, c.y);
        }
    }

    #[test]
    fn flat_image_has_no_features() {
        let data = vec![128u8; 64 * 64];
        let view = ImageView::from_slice(&data, 64, 64).unwrap();
        let features = OrbDetector::default().detect(view).unwrap();
        assert!(features.is_empty());
        assert!(features.descriptors.is_empty());
    }

    #[test]
    fn nms_keeps_strongest_per_neighbourhood() {
        let corners = vec![
            Corner { x: 10, y: 10, response: 1.0 },
            Corner { x: 12, y: 11, response: 5.0 },
            Corner { x: 40, y: 40, response: 2.0 },
        ];
        let kept = grid_nms(corners, 5, 10);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].x, kept[0].y), (12, 11));
        assert_eq!((kept[1].x, kept[1].y), (40, 40));

        let limited = grid_nms(kept, 5, 1);
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn detection_is_deterministic_and_bounded() {
        let data = square(64, 48);
        let view = ImageView::from_slice(&data, 64, 48).unwrap();
        let detector = OrbDetector::new(OrbConfig {
            max_keypoints: 3,
            ..OrbConfig::default()
        });
        let a = detector.detect(view).unwrap();
        let b = detector.detect(view).unwrap();
        assert!(a.len() <= 3);
        assert_eq!(a.keypoints, b.keypoints);
        assert_eq!(a.descriptors, b.descriptors);
        for kp in &a.keypoints {
            assert!(kp.x >= 0.0 && kp.x < 64.0 && kp.y >= 0.0 && kp.y < 48.0);
        }
    }
}

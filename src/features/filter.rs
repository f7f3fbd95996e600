//! Correspondence filters applied between k-NN matching and homography fitting.

use std::collections::HashSet;

use super::{Keypoint, Neighbor};
use crate::util::math::trunc_to_i32;

/// Pattern keypoint `query` matched to scene keypoint `train`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Correspondence {
    pub query: usize,
    pub train: usize,
}

/// Keeps a query's nearest neighbour when it has a second one and
/// `best < ratio * second`. Output follows query order.
pub fn ratio_test(neighbors: &[Vec<Neighbor>], ratio: f32) -> Vec<Correspondence> {
    neighbors
        .iter()
        .enumerate()
        .filter_map(|(query, list)| match list.as_slice() {
            [best, second, ..] if (best.distance as f32) < ratio * second.distance as f32 => {
                Some(Correspondence {
                    query,
                    train: best.index,
                })
            }
            _ => None,
        })
        .collect()
}

/// Drops correspondences whose scene keypoint lands on an integer pixel
/// already claimed by an earlier one. Coordinates are truncated, not rounded.
pub fn dedup_by_scene_point(
    correspondences: Vec<Correspondence>,
    scene_keypoints: &[Keypoint],
) -> Vec<Correspondence> {
    let mut seen = HashSet::new();
    correspondences
        .into_iter()
        .filter(|c| {
            scene_keypoints.get(c.train).is_some_and(|kp| {
                seen.insert((
                    trunc_to_i32(f64::from(kp.x)),
                    trunc_to_i32(f64::from(kp.y)),
                ))
            })
        })
        .collect()
}

//! Keypoint features: detector seam, ORB implementation, descriptor matching
//! and correspondence filters.

pub mod filter;
pub mod knn;
pub mod orb;

use crate::image::ImageView;
use crate::util::SceneMatchResult;

pub use filter::{dedup_by_scene_point, ratio_test, Correspondence};
pub use knn::{hamming, knn_match, Neighbor};
pub use orb::{OrbConfig, OrbDetector};

/// Binary descriptor, 256 bits.
pub type Descriptor = [u8; 32];

/// Keypoint in base-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Orientation in radians.
    pub angle: f32,
    pub response: f32,
    /// Pyramid level the keypoint was detected on.
    pub octave: u8,
}

/// Keypoints with their descriptors, index-aligned.
#[derive(Clone, Debug, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Detects keypoints and computes their descriptors on a grayscale image.
pub trait FeatureDetector: Send + Sync {
    fn detect(&self, image: ImageView<'_, u8>) -> SceneMatchResult<Features>;
}

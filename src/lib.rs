//! SceneMatch locates a pattern image inside a scene image.
//!
//! The primary path is an iterative ZNCC template match that reports every
//! non-overlapping instance above a score threshold, suppressing each hit in
//! a private working copy of the scene before searching again. When that
//! finds nothing, an ORB keypoint matcher with a RANSAC homography locates a
//! scaled or perspective-distorted instance instead.
//!
//! Optional features: `rayon` (row-parallel score maps, parallel
//! multi-pattern search), `simd` (vectorized correlation kernel),
//! `image-io` (file loading via `image`) and `tracing` (spans and events).

pub mod features;
pub mod geometry;
pub mod homography;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use features::{FeatureDetector, Features, Keypoint, OrbConfig, OrbDetector};
pub use geometry::{MatchKind, MatchResult, Point, Quad, Size};
pub use homography::{HomographyError, RansacConfig};
pub use image::gray::to_grayscale;
pub use image::{Channels, ColorImage, ColorView, ImageView, OwnedImage};
pub use kernel::MinMaxLoc;
pub use search::{ExactConfig, FeatureConfig, FindConfig, Finder};
pub use util::{SceneMatchError, SceneMatchResult};

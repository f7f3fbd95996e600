//! Result types: points, sizes, located quadrilaterals and matches.

/// Integer pixel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pattern dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Four corners of a located region.
///
/// Axis-aligned for exact matches; a general quadrilateral for homography
/// matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Quad {
    /// Axis-aligned rectangle whose far corner is `(x + width, y + height)`.
    pub fn from_rect(top_left: Point, size: Size) -> Self {
        let right = top_left.x + size.width as i32;
        let bottom = top_left.y + size.height as i32;
        Self {
            top_left,
            top_right: Point::new(right, top_left.y),
            bottom_left: Point::new(top_left.x, bottom),
            bottom_right: Point::new(right, bottom),
        }
    }

    /// Midpoint of the `top_left`/`bottom_right` diagonal, integer-truncated.
    pub fn center(&self) -> Point {
        Point::new(
            crate::util::math::midpoint_i32(self.top_left.x, self.bottom_right.x),
            crate::util::math::midpoint_i32(self.top_left.y, self.bottom_right.y),
        )
    }

    /// Corners in polygon order: top-left, bottom-left, bottom-right, top-right.
    pub fn polygon(&self) -> [Point; 4] {
        [
            self.top_left,
            self.bottom_left,
            self.bottom_right,
            self.top_right,
        ]
    }
}

/// How a match was obtained, with the figures that path can vouch for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchKind {
    /// Correlation peak from the exact-match loop.
    Exact { confidence: f32 },
    /// A single surviving keypoint correspondence; `confidence` is always 0.5.
    SingleFeature { confidence: f32 },
    /// Homography fitted on several correspondences.
    ///
    /// Neither field is a calibrated probability.
    Homography {
        /// `height / width` of the pattern, integer division.
        aspect_ratio: usize,
        /// Correspondences that survived the ratio test and deduplication.
        correspondences: usize,
    },
}

/// Sentinel confidence reported for a single-correspondence feature match.
pub const SINGLE_FEATURE_CONFIDENCE: f32 = 0.5;

/// One located instance of the pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    pub center: Point,
    pub top_left: Point,
    /// `None` only for `MatchKind::SingleFeature`.
    pub quad: Option<Quad>,
    pub kind: MatchKind,
    pub size: Size,
}

impl MatchResult {
    /// Exact match with the window's top-left corner at `top_left`.
    pub fn exact(top_left: Point, size: Size, confidence: f32) -> Self {
        let quad = Quad::from_rect(top_left, size);
        Self {
            center: quad.center(),
            top_left,
            quad: Some(quad),
            kind: MatchKind::Exact { confidence },
            size,
        }
    }

    /// Point-only feature match.
    pub fn single_feature(center: Point, size: Size) -> Self {
        Self {
            center,
            top_left: Point::default(),
            quad: None,
            kind: MatchKind::SingleFeature {
                confidence: SINGLE_FEATURE_CONFIDENCE,
            },
            size,
        }
    }

    /// Homography match located by `quad`.
    pub fn homography(quad: Quad, size: Size, correspondences: usize) -> Self {
        Self {
            center: quad.center(),
            top_left: quad.top_left,
            quad: Some(quad),
            kind: MatchKind::Homography {
                aspect_ratio: size.height / size.width.max(1),
                correspondences,
            },
            size,
        }
    }

    /// Confidence for exact and single-feature matches.
    pub fn confidence(&self) -> Option<f32> {
        match self.kind {
            MatchKind::Exact { confidence } | MatchKind::SingleFeature { confidence } => {
                Some(confidence)
            }
            MatchKind::Homography { .. } => None,
        }
    }

    /// Legacy positional view: `[confidence]`, `[0.5]` or
    /// `[aspect_ratio, correspondences]`.
    pub fn scores(&self) -> Vec<f32> {
        match self.kind {
            MatchKind::Exact { confidence } | MatchKind::SingleFeature { confidence } => {
                vec![confidence]
            }
            MatchKind::Homography {
                aspect_ratio,
                correspondences,
            } => vec![aspect_ratio as f32, correspondences as f32],
        }
    }
}

//! Region suppression on the call-local working scene.
//!
//! Once a match is reported its quad is painted with a flat sentinel
//! intensity. A flat window has zero variance and therefore scores `0.0`, so
//! a suppressed placement cannot pass a positive threshold, and the exact
//! locator stops outright when its chosen placement is flat.

use crate::geometry::Quad;
use crate::image::{ImageView, OwnedImage};

/// Intensity painted over suppressed regions.
pub const SUPPRESSION_FILL: u8 = 0;

/// Grayscale scene copy owned by one exact-locator call.
///
/// Built by copying the caller's pixels, so suppression is never visible
/// outside the call; dropped with the call on every exit path.
pub struct WorkingScene {
    image: OwnedImage,
}

impl WorkingScene {
    /// Copies `scene` into a fresh buffer.
    pub fn from_view(scene: ImageView<'_, u8>) -> Self {
        Self {
            image: OwnedImage::from_view(scene),
        }
    }

    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    /// Paints `quad` with `SUPPRESSION_FILL`.
    pub fn suppress(&mut self, quad: &Quad) {
        fill_quad(&mut self.image, quad, SUPPRESSION_FILL);
    }

    /// Hands back the suppressed buffer, mainly for inspection in tests.
    pub fn into_inner(self) -> OwnedImage {
        self.image
    }
}

/// Fills `quad`, boundary included and clipped to the image, with `value`.
///
/// Each row is filled between its outermost edge crossings, which is exact
/// for convex quads (every quad the exact locator produces).
pub fn fill_quad(image: &mut OwnedImage, quad: &Quad, value: u8) {
    let corners = quad.polygon().map(|p| [f64::from(p.x), f64::from(p.y)]);
    let min_y = corners.iter().map(|c| c[1]).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c[1]).fold(f64::NEG_INFINITY, f64::max);
    let height = image.height() as f64;
    let width = image.width() as i64;

    let y_start = min_y.max(0.0) as usize;
    let y_end = max_y.min(height - 1.0);
    if y_end < 0.0 || (y_start as f64) > y_end {
        return;
    }

    for y in y_start..=y_end as usize {
        let Some((left, right)) = row_span(&corners, y as f64) else {
            continue;
        };
        let x0 = (left.round() as i64).max(0);
        let x1 = (right.round() as i64).min(width - 1);
        if x0 > x1 {
            continue;
        }
        if let Some(row) = image.row_mut(y) {
            row[x0 as usize..=x1 as usize].fill(value);
        }
    }
}

/// Leftmost and rightmost crossing of row `y` with the polygon edges.
fn row_span(corners: &[[f64; 2]; 4], y: f64) -> Option<(f64, f64)> {
    let mut left = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        let (lo, hi) = if a[1] <= b[1] { (a, b) } else { (b, a) };
        if y < lo[1] || y > hi[1] {
            continue;
        }
        if hi[1] == lo[1] {
            left = left.min(lo[0].min(hi[0]));
            right = right.max(lo[0].max(hi[0]));
        } else {
            let x = lo[0] + (y - lo[1]) * (hi[0] - lo[0]) / (hi[1] - lo[1]);
            left = left.min(x);
            right = right.max(x);
        }
    }
    (left <= right).then_some((left, right))
}

#[cfg(test)]
mod tests {
    use super::{fill_quad, WorkingScene};
    use crate::geometry::{Point, Quad, Size};
    use crate::image::{ImageView, OwnedImage};

    #[test]
    fn rect_fill_covers_inclusive_far_corner() {
        let mut img = OwnedImage::new(vec![9u8; 8 * 6], 8, 6).unwrap();
        let quad = Quad::from_rect(Point::new(2, 1), Size::new(3, 2));
        fill_quad(&mut img, &quad, 0);
        for y in 0..6 {
            for x in 0..8 {
                let inside = (2..=5).contains(&x) && (1..=3).contains(&y);
                let v = img.data()[y * 8 + x];
                assert_eq!(v == 0, inside, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn fill_clips_to_image_bounds() {
        let mut img = OwnedImage::new(vec![9u8; 4 * 4], 4, 4).unwrap();
        let quad = Quad::from_rect(Point::new(2, 2), Size::new(10, 10));
        fill_quad(&mut img, &quad, 0);
        assert_eq!(img.data().iter().filter(|&&v| v == 0).count(), 4);

        let outside = Quad::from_rect(Point::new(-20, -20), Size::new(5, 5));
        fill_quad(&mut img, &outside, 1);
        assert!(!img.data().contains(&1));
    }

    #[test]
    fn diamond_fill_is_convex_span() {
        let mut img = OwnedImage::new(vec![9u8; 9 * 9], 9, 9).unwrap();
        let quad = Quad {
            top_left: Point::new(4, 0),
            top_right: Point::new(8, 4),
            bottom_right: Point::new(4, 8),
            bottom_left: Point::new(0, 4),
        };
        fill_quad(&mut img, &quad, 0);
        let row4: Vec<u8> = img.data()[4 * 9..5 * 9].to_vec();
        assert!(row4.iter().all(|&v| v == 0));
        assert_eq!(img.data()[4], 0);
        assert_eq!(img.data()[0], 9);
        assert_eq!(img.data()[2 * 9 + 2], 0);
        assert_eq!(img.data()[2 * 9 + 1], 9);
    }

    #[test]
    fn working_scene_never_touches_the_source() {
        let source = vec![200u8; 5 * 5];
        let view = ImageView::from_slice(&source, 5, 5).unwrap();
        let mut work = WorkingScene::from_view(view);
        work.suppress(&Quad::from_rect(Point::new(0, 0), Size::new(2, 2)));
        assert!(source.iter().all(|&v| v == 200));
        let out = work.into_inner();
        assert_eq!(out.data()[0], 0);
        assert_eq!(out.data()[4], 200);
    }
}

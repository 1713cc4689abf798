//! Points, quadrilaterals and projective transforms.

mod homography;
mod ransac;

pub use homography::Homography;
pub use ransac::{fit_homography_ransac, RansacConfig, RansacFit};

/// Integer pixel coordinates.
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

/// Four corners of a detected region.
///
/// Corners are the images of the search image's top-left, bottom-left,
/// bottom-right and top-right pixels, in that order. Under rotation the
/// first corner need not be the visually top-left one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// Maps the corners of a `width` x `height` image through `h`.
    ///
    /// Coordinates are truncated toward zero. Returns `None` when a corner
    /// projects to infinity or outside the `i32` range.
    pub fn from_homography(h: &Homography, width: usize, height: usize) -> Option<Self> {
        let w = width.saturating_sub(1) as f64;
        let hh = height.saturating_sub(1) as f64;
        let corners = [(0.0, 0.0), (0.0, hh), (w, hh), (w, 0.0)];
        let mut out = [Point::default(); 4];
        for (dst, (x, y)) in out.iter_mut().zip(corners) {
            let (px, py) = h.project(x, y)?;
            if px.abs() > i32::MAX as f64 || py.abs() > i32::MAX as f64 {
                return None;
            }
            *dst = Point::new(px as i32, py as i32);
        }
        Some(Self(out))
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    /// Axis-aligned bounds as `(min, max)` corners.
    pub fn bounds(&self) -> (Point, Point) {
        let xs = self.0.iter().map(|p| p.x);
        let ys = self.0.iter().map(|p| p.y);
        let min = Point::new(xs.clone().min().unwrap_or(0), ys.clone().min().unwrap_or(0));
        let max = Point::new(xs.max().unwrap_or(0), ys.max().unwrap_or(0));
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::{Homography, Point, Quad};
    use nalgebra::Matrix3;

    #[test]
    fn quad_of_translation_keeps_corner_order() {
        let h = Homography::from_matrix(Matrix3::new(1.0, 0.0, 10.0, 0.0, 1.0, 20.0, 0.0, 0.0, 1.0))
            .unwrap();
        let quad = Quad::from_homography(&h, 5, 4).unwrap();
        assert_eq!(
            quad.corners(),
            &[
                Point::new(10, 20),
                Point::new(10, 23),
                Point::new(14, 23),
                Point::new(14, 20)
            ]
        );
        assert_eq!(quad.bounds(), (Point::new(10, 20), Point::new(14, 23)));
    }

    #[test]
    fn quad_truncates_toward_zero() {
        let h = Homography::from_matrix(Matrix3::new(1.0, 0.0, -0.5, 0.0, 1.0, 2.7, 0.0, 0.0, 1.0))
            .unwrap();
        let quad = Quad::from_homography(&h, 2, 2).unwrap();
        assert_eq!(quad.top_left(), Point::new(0, 2));
        assert_eq!(quad.corners()[2], Point::new(0, 3));
    }
}

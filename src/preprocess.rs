//! Plane filters applied before correlation.
//!
//! Preprocessing runs on both the source and the search planes ahead of the
//! extraction loop, so it changes what is compared without touching how
//! matches are extracted.

use crate::image::OwnedImage;
use crate::util::LocateResult;

/// A transformation of a single 8-bit plane.
pub trait Preprocess: Send + Sync {
    fn apply(&self, plane: &OwnedImage) -> LocateResult<OwnedImage>;
}

/// Canny edge map; flat background becomes zero so only outlines correlate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeFilter {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeFilter {
    fn default() -> Self {
        Self {
            low_threshold: 100.0,
            high_threshold: 200.0,
        }
    }
}

impl Preprocess for EdgeFilter {
    fn apply(&self, plane: &OwnedImage) -> LocateResult<OwnedImage> {
        let gray = plane.to_gray_image()?;
        let edges = imageproc::edges::canny(&gray, self.low_threshold, self.high_threshold);
        OwnedImage::from_gray_image(edges)
    }
}

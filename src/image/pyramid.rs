//! Scale pyramid for grayscale images.
//!
//! Each level shrinks the previous one by a constant factor using a Gaussian
//! resampling filter. Construction stops early once a level would drop below
//! `min_size` in either dimension, so the base level is always present and
//! small inputs simply yield fewer levels.

use image::imageops::{self, FilterType};
use image::GrayImage;

/// One pyramid level and its scale relative to the base image.
pub struct PyramidLevel {
    pub image: GrayImage,
    /// Multiply level coordinates by this to get base coordinates.
    pub scale: f32,
}

/// Owned image pyramid built from a base level.
pub struct ScalePyramid {
    levels: Vec<PyramidLevel>,
}

impl ScalePyramid {
    /// Builds up to `max_levels` levels, each `factor` times smaller.
    ///
    /// `max_levels` is clamped to at least 1.
    pub fn build(base: &GrayImage, max_levels: usize, factor: f32, min_size: u32) -> Self {
        let max_levels = max_levels.max(1);
        let mut levels = Vec::with_capacity(max_levels);
        levels.push(PyramidLevel {
            image: base.clone(),
            scale: 1.0,
        });

        let mut scale = 1.0f32;
        while levels.len() < max_levels && factor > 1.0 {
            scale *= factor;
            let width = (base.width() as f32 / scale).round() as u32;
            let height = (base.height() as f32 / scale).round() as u32;
            if width < min_size || height < min_size {
                break;
            }
            let image = imageops::resize(base, width, height, FilterType::Gaussian);
            levels.push(PyramidLevel { image, scale });
        }

        Self { levels }
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::ScalePyramid;
    use image::GrayImage;

    #[test]
    fn pyramid_stops_at_min_size() {
        let base = GrayImage::new(100, 80);
        let pyramid = ScalePyramid::build(&base, 8, 2.0, 20);
        let sizes: Vec<_> = pyramid
            .levels()
            .iter()
            .map(|l| (l.image.width(), l.image.height()))
            .collect();
        assert_eq!(sizes, vec![(100, 80), (50, 40), (25, 20)]);
        assert!((pyramid.levels()[2].scale - 4.0).abs() < 1e-6);
    }

    #[test]
    fn pyramid_always_keeps_base() {
        let base = GrayImage::new(10, 10);
        let pyramid = ScalePyramid::build(&base, 0, 1.2, 40);
        assert_eq!(pyramid.levels().len(), 1);
        assert_eq!(pyramid.levels()[0].scale, 1.0);
    }
}

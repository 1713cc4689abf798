//! Oriented FAST keypoints with rotated BRIEF descriptors.
//!
//! Corners come from FAST-9 on every level of a scale pyramid and are thinned
//! with radius non-maximum suppression. Orientation is the intensity centroid
//! of a disk around the corner. Descriptors compare 256 point pairs of a
//! fixed pattern, rotated by the keypoint angle and sampled on a smoothed
//! copy of the level.

use super::{Descriptor, Feature, FeatureDetector, FeatureSet, Keypoint};
use crate::image::pyramid::{PyramidLevel, ScalePyramid};
use crate::image::Image;
use crate::trace::{trace_debug, trace_span};
use crate::util::math::wrap_rad;
use crate::util::LocateResult;
use image::GrayImage;
use imageproc::corners::{corners_fast9, Corner};
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PAIRS: usize = 256;
/// Radius of the disk the sampling pattern is drawn from.
const PATTERN_RADIUS: i32 = 13;

/// ORB detector parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbConfig {
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Maximum number of features kept, strongest first.
    pub max_features: usize,
    /// Number of pyramid levels, the base included.
    pub levels: usize,
    /// Downscale factor between pyramid levels.
    pub scale_factor: f32,
    /// Radius of the orientation patch; also sets the image border that
    /// keypoints must keep.
    pub patch_radius: u32,
    /// Corners closer than this to a stronger corner are dropped.
    pub nms_radius: u32,
    /// Gaussian sigma of the smoothing applied before sampling descriptors.
    pub blur_sigma: f32,
    /// Seed for the sampling pattern.
    pub pattern_seed: u64,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_features: 500,
            levels: 4,
            scale_factor: 1.2,
            patch_radius: 15,
            nms_radius: 3,
            blur_sigma: 2.0,
            pattern_seed: 0x0b1e_f00d,
        }
    }
}

impl OrbConfig {
    pub fn with_fast_threshold(mut self, threshold: u8) -> Self {
        self.fast_threshold = threshold;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    fn border(&self) -> u32 {
        self.patch_radius.max(PATTERN_RADIUS as u32) + 1
    }
}

/// ORB feature detector; the default [`FeatureDetector`].
#[derive(Clone, Debug)]
pub struct OrbDetector {
    config: OrbConfig,
    pattern: Vec<[(i32, i32); 2]>,
    /// Half-widths of the orientation disk, indexed by `dy + radius`.
    disk: Vec<i32>,
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self::new(OrbConfig::default())
    }
}

impl OrbDetector {
    pub fn new(config: OrbConfig) -> Self {
        let pattern = sampling_pattern(config.pattern_seed);
        let r = config.patch_radius as i32;
        let disk = (-r..=r)
            .map(|dy| (((r * r - dy * dy) as f32).sqrt()).floor() as i32)
            .collect();
        Self {
            config,
            pattern,
            disk,
        }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.config
    }

    fn detect_level(&self, level: &PyramidLevel, octave: u8) -> Vec<Feature> {
        let img = &level.image;
        let border = self.config.border();
        if img.width() <= 2 * border || img.height() <= 2 * border {
            return Vec::new();
        }

        let mut corners: Vec<Corner> = corners_fast9(img, self.config.fast_threshold)
            .into_iter()
            .filter(|c| {
                c.x >= border
                    && c.y >= border
                    && c.x < img.width() - border
                    && c.y < img.height() - border
            })
            .collect();
        corners.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });
        let kept = suppress_neighbours(&corners, img.width(), img.height(), self.config.nms_radius);

        let smoothed = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(img, self.config.blur_sigma)
        } else {
            img.clone()
        };
        let features: Vec<Feature> = kept
            .into_iter()
            .map(|c| {
                let angle = self.orientation(img, c.x as i32, c.y as i32);
                let descriptor = self.describe(&smoothed, c.x as i32, c.y as i32, angle);
                Feature {
                    keypoint: Keypoint {
                        x: c.x as f32 * level.scale,
                        y: c.y as f32 * level.scale,
                        angle,
                        response: c.score,
                        octave,
                    },
                    descriptor,
                }
            })
            .collect();
        trace_debug!("orb_level", octave = octave, features = features.len());
        features
    }

    fn orientation(&self, img: &GrayImage, cx: i32, cy: i32) -> f32 {
        let r = self.config.patch_radius as i32;
        let (mut m10, mut m01) = (0i64, 0i64);
        for (dy, &half) in (-r..=r).zip(&self.disk) {
            for dx in -half..=half {
                let v = i64::from(img.get_pixel((cx + dx) as u32, (cy + dy) as u32)[0]);
                m10 += i64::from(dx) * v;
                m01 += i64::from(dy) * v;
            }
        }
        wrap_rad((m01 as f32).atan2(m10 as f32))
    }

    fn describe(&self, smoothed: &GrayImage, cx: i32, cy: i32, angle: f32) -> Descriptor {
        let (sin, cos) = angle.sin_cos();
        let max_x = smoothed.width() as i32 - 1;
        let max_y = smoothed.height() as i32 - 1;
        let sample = |(px, py): (i32, i32)| {
            let (px, py) = (px as f32, py as f32);
            let x = cx + (cos * px - sin * py).round() as i32;
            let y = cy + (sin * px + cos * py).round() as i32;
            smoothed.get_pixel(x.clamp(0, max_x) as u32, y.clamp(0, max_y) as u32)[0]
        };

        let mut descriptor = [0u8; 32];
        for (i, &[a, b]) in self.pattern.iter().enumerate() {
            if sample(a) < sample(b) {
                descriptor[i / 8] |= 1 << (i % 8);
            }
        }
        descriptor
    }
}

impl FeatureDetector for OrbDetector {
    fn detect(&self, image: &Image) -> LocateResult<FeatureSet> {
        let _span = trace_span!("orb_detect").entered();
        let gray = image.to_gray().to_gray_image()?;
        let border = self.config.border();
        let pyramid = ScalePyramid::build(
            &gray,
            self.config.levels,
            self.config.scale_factor,
            2 * border + 1,
        );

        let mut features: Vec<Feature> = pyramid
            .levels()
            .iter()
            .enumerate()
            .flat_map(|(octave, level)| self.detect_level(level, octave as u8))
            .collect();
        features.sort_by(|a, b| {
            let (ka, kb) = (&a.keypoint, &b.keypoint);
            kb.response
                .total_cmp(&ka.response)
                .then(ka.octave.cmp(&kb.octave))
                .then(ka.y.total_cmp(&kb.y))
                .then(ka.x.total_cmp(&kb.x))
        });
        features.truncate(self.config.max_features);
        Ok(FeatureSet::new(features))
    }
}

/// Greedy radius suppression over corners sorted strongest first.
fn suppress_neighbours(sorted: &[Corner], width: u32, height: u32, radius: u32) -> Vec<Corner> {
    let (w, h) = (width as i32, height as i32);
    let r = radius as i32;
    let mut blocked = vec![false; (width * height) as usize];
    let mut kept = Vec::new();
    for c in sorted {
        let idx = (c.y * width + c.x) as usize;
        if blocked[idx] {
            continue;
        }
        kept.push(*c);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let (x, y) = (c.x as i32 + dx, c.y as i32 + dy);
                if x >= 0 && y >= 0 && x < w && y < h {
                    blocked[(y * w + x) as usize] = true;
                }
            }
        }
    }
    kept
}

fn sampling_pattern(seed: u64) -> Vec<[(i32, i32); 2]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut point = || loop {
        let x = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
        let y = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
        if x * x + y * y <= PATTERN_RADIUS * PATTERN_RADIUS {
            return (x, y);
        }
    };
    (0..PAIRS)
        .map(|_| loop {
            let pair = [point(), point()];
            if pair[0] != pair[1] {
                break pair;
            }
        })
        .collect()
}

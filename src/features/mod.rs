//! Keypoint detection, binary descriptors and descriptor matching.
//!
//! Detected features live in a [`FeatureSet`] arena. The feature matcher
//! consumes matched features between iterations by marking their indices as
//! removed; indices stay stable for the lifetime of the set.

use crate::image::Image;
use crate::util::LocateResult;
use std::collections::HashSet;

mod knn;
mod orb;

pub use knn::{knn_match, ratio_test, DMatch};
pub use orb::{OrbConfig, OrbDetector};

/// 256-bit binary descriptor.
pub type Descriptor = [u8; 32];

/// Detected keypoint in base-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Dominant orientation in radians, in `[-pi, pi)`.
    pub angle: f32,
    /// Detector response; larger is stronger.
    pub response: f32,
    /// Pyramid level the keypoint was found on.
    pub octave: u8,
}

/// Keypoint with its descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: Descriptor,
}

/// Produces features for an image.
pub trait FeatureDetector: Send + Sync {
    fn detect(&self, image: &Image) -> LocateResult<FeatureSet>;
}

/// Dense feature arena with a set of removed indices.
#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
    removed: HashSet<usize>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            removed: HashSet::new(),
        }
    }

    /// Number of features ever stored, removed ones included.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of features not yet removed.
    pub fn active_len(&self) -> usize {
        self.features.len() - self.removed.len()
    }

    pub fn get(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn is_active(&self, index: usize) -> bool {
        index < self.features.len() && !self.removed.contains(&index)
    }

    /// Marks a feature as consumed. Returns `false` if it was already removed
    /// or out of range.
    pub fn remove(&mut self, index: usize) -> bool {
        index < self.features.len() && self.removed.insert(index)
    }

    /// Active features with their arena indices, in index order.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Feature)> + '_ {
        self.features
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.removed.contains(i))
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

//! Locating a search image inside a source image.
//!
//! Two strategies are available. Template matching slides the search image
//! over the source and extracts correlation peaks; feature matching pairs
//! keypoint descriptors and fits a homography per occurrence. [`Locator`]
//! picks one per call from how textured the search image is.

mod feature;
mod locate;
mod template;

use crate::geometry::{Point, Quad};

pub use feature::{find_all_features, find_features, FeatureConfig, FeatureMatcher};
pub use locate::{find, find_all, keypoint_count, LocateConfig, Located, Locator};
pub use template::{find_all_template, find_template, TemplateConfig, TemplateMatcher};

/// One occurrence of the search image in the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Centre of the occurrence in source pixels.
    pub center: Point,
    /// ZNCC score for template matches, RANSAC inlier ratio for feature
    /// matches.
    pub score: f32,
    /// Projected outline; only feature matches have one.
    pub region: Option<Quad>,
}

/// Matching strategy used for a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Template,
    Features,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Template => "template",
            Strategy::Features => "features",
        }
    }
}

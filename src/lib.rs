//! imlocate finds where a small search image occurs inside a larger source
//! image.
//!
//! Two strategies are provided. Template matching correlates the search
//! image against every placement (ZNCC) and extracts peaks one occurrence at
//! a time; it is exact for unrotated, unscaled copies. Feature matching pairs
//! ORB descriptors and fits a homography per occurrence, so it also handles
//! rotation, scale and perspective. [`Locator`] chooses between them from the
//! keypoint count of the search image.
//!
//! Optional features: `rayon` parallelizes correlation and descriptor
//! matching, `tracing` emits spans and events, `image-io` (default) adds file
//! loading.

pub mod features;
pub mod field;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod preprocess;
pub mod search;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io::{load_gray_image, load_image};
pub use features::{Feature, FeatureDetector, FeatureSet, Keypoint, OrbConfig, OrbDetector};
pub use field::{Extremum, Polarity, SimilarityField};
pub use geometry::{Homography, Point, Quad, RansacConfig};
pub use crate::image::{Image, ImageView, OwnedImage};
pub use preprocess::{EdgeFilter, Preprocess};
pub use search::{
    find, find_all, find_all_features, find_all_template, find_features, find_template,
    keypoint_count, FeatureConfig, FeatureMatcher, LocateConfig, Located, Locator, MatchResult,
    Strategy, TemplateConfig, TemplateMatcher,
};
pub use template::{ChannelMode, ChannelWeights};
pub use util::{LocateError, LocateResult};

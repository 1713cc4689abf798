//! Strategy selection between feature and template matching.
//!
//! Textured search images (many keypoints) go to the feature matcher, which
//! tolerates rotation and scale. Plain ones fall back to template matching,
//! which needs no keypoints at all.

use crate::features::FeatureDetector;
use crate::geometry::Point;
use crate::image::Image;
use crate::search::{FeatureConfig, FeatureMatcher, MatchResult, Strategy, TemplateConfig, TemplateMatcher};
use crate::trace::{trace_event, trace_span};
use crate::util::LocateResult;

/// Strategy selector parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocateConfig {
    /// Search images with at least this many keypoints use feature matching.
    pub richness_threshold: usize,
    pub template: TemplateConfig,
    pub features: FeatureConfig,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            richness_threshold: 20,
            template: TemplateConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

impl LocateConfig {
    pub fn with_richness_threshold(mut self, threshold: usize) -> Self {
        self.richness_threshold = threshold;
        self
    }

    pub fn with_template(mut self, template: TemplateConfig) -> Self {
        self.template = template;
        self
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }
}

/// Matches found by [`Locator::locate_all`] and the strategy that found them.
#[derive(Clone, Debug, PartialEq)]
pub struct Located {
    pub strategy: Strategy,
    pub matches: Vec<MatchResult>,
}

/// Picks a matching strategy per call and runs it.
pub struct Locator {
    richness_threshold: usize,
    template: TemplateMatcher,
    features: FeatureMatcher,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(LocateConfig::default())
    }
}

impl Locator {
    pub fn new(config: LocateConfig) -> Self {
        Self {
            richness_threshold: config.richness_threshold,
            template: TemplateMatcher::new(config.template),
            features: FeatureMatcher::new(config.features),
        }
    }

    /// Number of keypoints the feature matcher would see in `image`.
    pub fn keypoint_count(&self, image: &Image) -> LocateResult<usize> {
        Ok(self.features.detector().detect(image)?.len())
    }

    /// Runs the selected strategy and returns full match records.
    ///
    /// A feature search that finds too few features in the source yields no
    /// matches; it does not fall back to template matching.
    pub fn locate_all(
        &self,
        source: &Image,
        search: &Image,
        max_count: usize,
    ) -> LocateResult<Located> {
        let _span = trace_span!("locate", max_count = max_count).entered();
        let search_features = self.features.detector().detect(search)?;
        let keypoints = search_features.len();

        if keypoints >= self.richness_threshold {
            trace_event!("strategy", chosen = "features", keypoints = keypoints);
            let matches = self
                .features
                .find_all_detected(source, search, search_features, max_count)?
                .unwrap_or_default();
            Ok(Located {
                strategy: Strategy::Features,
                matches,
            })
        } else {
            trace_event!("strategy", chosen = "template", keypoints = keypoints);
            let matches = self.template.find_all(source, search, max_count)?;
            Ok(Located {
                strategy: Strategy::Template,
                matches,
            })
        }
    }

    /// Centres of up to `max_count` occurrences (0 = all).
    pub fn find_all(
        &self,
        source: &Image,
        search: &Image,
        max_count: usize,
    ) -> LocateResult<Vec<Point>> {
        let located = self.locate_all(source, search, max_count)?;
        Ok(located.matches.into_iter().map(|m| m.center).collect())
    }

    /// Centre of the best occurrence.
    pub fn find(&self, source: &Image, search: &Image) -> LocateResult<Option<Point>> {
        Ok(self.find_all(source, search, 1)?.into_iter().next())
    }
}

/// [`Locator::find_all`] with default settings.
pub fn find_all(source: &Image, search: &Image, max_count: usize) -> LocateResult<Vec<Point>> {
    Locator::default().find_all(source, search, max_count)
}

/// [`Locator::find`] with default settings.
pub fn find(source: &Image, search: &Image) -> LocateResult<Option<Point>> {
    Locator::default().find(source, search)
}

/// [`Locator::keypoint_count`] with default settings.
pub fn keypoint_count(image: &Image) -> LocateResult<usize> {
    Locator::default().keypoint_count(image)
}

#[cfg(test)]
mod tests {
    use super::{LocateConfig, Locator};
    use crate::geometry::Point;
    use crate::image::Image;
    use crate::search::Strategy;

    #[test]
    fn plain_search_uses_template_matching() {
        let mut data = vec![30u8; 100 * 100];
        for y in 40..50 {
            for x in 10..20 {
                data[y * 100 + x] = 220;
            }
        }
        let source = Image::gray(data, 100, 100).unwrap();
        let search = Image::gray(vec![220; 100], 10, 10).unwrap();
        let located = Locator::default().locate_all(&source, &search, 0).unwrap();
        assert_eq!(located.strategy, Strategy::Template);
        assert_eq!(located.matches[0].center, Point::new(15, 45));
    }

    #[test]
    fn zero_richness_threshold_forces_features() {
        let source = Image::gray(vec![0; 64 * 64], 64, 64).unwrap();
        let search = Image::gray(vec![0; 32 * 32], 32, 32).unwrap();
        let locator = Locator::new(LocateConfig::default().with_richness_threshold(0));
        let located = locator.locate_all(&source, &search, 0).unwrap();
        assert_eq!(located.strategy, Strategy::Features);
        assert!(located.matches.is_empty());
    }
}

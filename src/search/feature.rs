//! Keypoint-based matching with a homography per occurrence.
//!
//! Each round matches the remaining search features against the remaining
//! source features, fits a homography to the unambiguous matches and maps
//! the search outline into the source. Features used in a round are removed
//! from both sets before the next round.

use crate::features::{knn_match, ratio_test, FeatureDetector, FeatureSet, OrbConfig, OrbDetector};
use crate::geometry::{fit_homography_ransac, Point, Quad, RansacConfig};
use crate::image::Image;
use crate::search::MatchResult;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{LocateError, LocateResult};

/// Smallest correspondence count a homography can be fitted from.
const MIN_CORRESPONDENCES: usize = 4;

/// Feature matching parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureConfig {
    /// Minimum features per image, and minimum ratio-test survivors per
    /// round.
    pub min_match_count: usize,
    /// Lowe ratio: a match is kept when `best < ratio * second`.
    pub ratio: f32,
    pub ransac: RansacConfig,
    pub orb: OrbConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_match_count: 10,
            ratio: 0.7,
            ransac: RansacConfig::default(),
            orb: OrbConfig::default(),
        }
    }
}

impl FeatureConfig {
    pub fn with_min_match_count(mut self, count: usize) -> Self {
        self.min_match_count = count;
        self
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    fn validate(&self) -> LocateResult<()> {
        if self.min_match_count < MIN_CORRESPONDENCES {
            return Err(LocateError::InvalidInput("min_match_count must be at least 4"));
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(LocateError::InvalidInput("ratio must be in (0, 1]"));
        }
        if !(self.ransac.threshold.is_finite() && self.ransac.threshold > 0.0) {
            return Err(LocateError::InvalidInput(
                "reprojection threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Finds occurrences of a search image by descriptor matching.
#[derive(Clone, Debug)]
pub struct FeatureMatcher<D = OrbDetector> {
    config: FeatureConfig,
    detector: D,
}

impl Default for FeatureMatcher {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

impl FeatureMatcher {
    /// Matcher using an [`OrbDetector`] built from `config.orb`.
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            detector: OrbDetector::new(config.orb),
        }
    }
}

impl<D: FeatureDetector> FeatureMatcher<D> {
    pub fn with_detector(config: FeatureConfig, detector: D) -> Self {
        Self { config, detector }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Returns `Ok(None)` when either image has fewer than
    /// `min_match_count` features, else up to `max_count` matches
    /// (0 = until matching runs dry).
    pub fn find_all(
        &self,
        source: &Image,
        search: &Image,
        max_count: usize,
    ) -> LocateResult<Option<Vec<MatchResult>>> {
        self.config.validate()?;
        let search_features = self.detector.detect(search)?;
        self.find_all_detected(source, search, search_features, max_count)
    }

    /// Best occurrence, if the images have enough features and one is found.
    pub fn find(&self, source: &Image, search: &Image) -> LocateResult<Option<MatchResult>> {
        Ok(self
            .find_all(source, search, 1)?
            .and_then(|found| found.into_iter().next()))
    }

    /// Runs the matching loop with features already detected on `search`.
    pub(crate) fn find_all_detected(
        &self,
        source: &Image,
        search: &Image,
        mut search_features: FeatureSet,
        max_count: usize,
    ) -> LocateResult<Option<Vec<MatchResult>>> {
        self.config.validate()?;
        let _span = trace_span!(
            "find_all_features",
            width = search.width(),
            height = search.height(),
            max_count = max_count
        )
        .entered();

        let min = self.config.min_match_count;
        if search_features.active_len() < min {
            trace_event!("too_few_features", image = "search", count = search_features.active_len());
            return Ok(None);
        }
        let mut source_features = self.detector.detect(source)?;
        if source_features.active_len() < min {
            trace_event!("too_few_features", image = "source", count = source_features.active_len());
            return Ok(None);
        }

        let (w, h) = (search.width(), search.height());
        let mut results = Vec::new();
        loop {
            let good = ratio_test(&knn_match(&search_features, &source_features, 2), self.config.ratio);
            if good.len() < min {
                trace_event!("feature_stop", good = good.len(), found = results.len());
                break;
            }

            let (src_pts, dst_pts): (Vec<_>, Vec<_>) = good
                .iter()
                .filter_map(|m| {
                    let q = search_features.get(m.query)?.keypoint;
                    let t = source_features.get(m.train)?.keypoint;
                    Some(((f64::from(q.x), f64::from(q.y)), (f64::from(t.x), f64::from(t.y))))
                })
                .unzip();
            let Some(fit) = fit_homography_ransac(&src_pts, &dst_pts, &self.config.ransac) else {
                trace_event!("feature_stop_fit", good = good.len(), found = results.len());
                break;
            };
            let Some(quad) = Quad::from_homography(&fit.homography, w, h) else {
                trace_event!("feature_stop_projection", found = results.len());
                break;
            };

            let top_left = quad.top_left();
            let center = Point::new(top_left.x + (w / 2) as i32, top_left.y + (h / 2) as i32);
            let score = fit.inlier_ratio();
            trace_debug!(
                "feature_match",
                x = center.x,
                y = center.y,
                score = score,
                good = good.len()
            );
            results.push(MatchResult {
                center,
                score,
                region: Some(quad),
            });
            if max_count != 0 && results.len() >= max_count {
                break;
            }

            for m in &good {
                search_features.remove(m.query);
                source_features.remove(m.train);
            }
        }

        trace_event!("features_done", matches = results.len());
        Ok(Some(results))
    }
}

/// Feature matching with default detector settings; see
/// [`FeatureMatcher::find_all`].
pub fn find_all_features(
    source: &Image,
    search: &Image,
    min_match_count: usize,
    max_count: usize,
) -> LocateResult<Option<Vec<MatchResult>>> {
    let config = FeatureConfig::default().with_min_match_count(min_match_count);
    FeatureMatcher::new(config).find_all(source, search, max_count)
}

/// Single best feature match; see [`find_all_features`].
pub fn find_features(
    source: &Image,
    search: &Image,
    min_match_count: usize,
) -> LocateResult<Option<MatchResult>> {
    let config = FeatureConfig::default().with_min_match_count(min_match_count);
    FeatureMatcher::new(config).find(source, search)
}

#[cfg(test)]
mod tests {
    use super::{find_all_features, FeatureConfig, FeatureMatcher};
    use crate::image::Image;
    use crate::util::LocateError;

    #[test]
    fn flat_search_has_too_few_features() {
        let source = Image::gray(vec![0; 120 * 120], 120, 120).unwrap();
        let search = Image::gray(vec![200; 40 * 40], 40, 40).unwrap();
        assert_eq!(find_all_features(&source, &search, 10, 0).unwrap(), None);
    }

    #[test]
    fn tiny_min_match_count_is_rejected() {
        let img = Image::gray(vec![0; 100], 10, 10).unwrap();
        let matcher = FeatureMatcher::new(FeatureConfig::default().with_min_match_count(3));
        assert!(matches!(
            matcher.find_all(&img, &img, 0),
            Err(LocateError::InvalidInput(_))
        ));
    }
}

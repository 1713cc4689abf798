//! Correlation-based matching with iterative peak extraction.
//!
//! The search image is correlated against the whole source once. Matches are
//! then pulled from the field one at a time: take the global maximum, record
//! it, and overwrite its neighbourhood so the next maximum belongs to a
//! different occurrence.

use crate::field::{Polarity, SimilarityField};
use crate::geometry::Point;
use crate::image::{Image, OwnedImage};
use crate::kernel;
use crate::preprocess::{EdgeFilter, Preprocess};
use crate::search::MatchResult;
use crate::template::{split_planes, ChannelMode, ChannelWeights, Template};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::half_diagonal;
use crate::util::{LocateError, LocateResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Score written over consumed placements; below any valid threshold.
const SUPPRESSED: f32 = -1000.0;
/// Flood fill takes neighbours down to this far below the threshold.
const FLOOD_MARGIN: f32 = 0.1;
/// Flood fill upper tolerance above the peak.
const FLOOD_UP: f32 = 1.0;

/// Template matching parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateConfig {
    /// Minimum ZNCC score a match must reach.
    pub threshold: f32,
    /// Gray or weighted colour correlation.
    pub channels: ChannelMode,
    /// Replace both images by their edge maps before correlating.
    pub remove_background: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            channels: ChannelMode::Gray,
            remove_background: false,
        }
    }
}

impl TemplateConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Switches between gray and colour correlation with default weights.
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.channels = if use_color {
            ChannelMode::Color(ChannelWeights::default())
        } else {
            ChannelMode::Gray
        };
        self
    }

    pub fn with_channels(mut self, channels: ChannelMode) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_remove_background(mut self, remove: bool) -> Self {
        self.remove_background = remove;
        self
    }

    fn validate(&self) -> LocateResult<()> {
        if !self.threshold.is_finite() || self.threshold < -1.0 {
            return Err(LocateError::InvalidInput(
                "threshold must be finite and at least -1",
            ));
        }
        Ok(())
    }
}

/// Finds occurrences of a search image by normalized cross-correlation.
pub struct TemplateMatcher {
    config: TemplateConfig,
    preprocess: Option<Box<dyn Preprocess>>,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(TemplateConfig::default())
    }
}

impl TemplateMatcher {
    /// Builds a matcher; `remove_background` installs the default [`EdgeFilter`].
    pub fn new(config: TemplateConfig) -> Self {
        let preprocess: Option<Box<dyn Preprocess>> = if config.remove_background {
            Some(Box::new(EdgeFilter::default()))
        } else {
            None
        };
        Self { config, preprocess }
    }

    /// Builds a matcher with a custom preprocessing stage.
    pub fn with_preprocess(config: TemplateConfig, preprocess: Box<dyn Preprocess>) -> Self {
        Self {
            config,
            preprocess: Some(preprocess),
        }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Returns up to `max_count` matches (0 = all) scoring at least the
    /// threshold, best first.
    ///
    /// Match centres are pairwise farther apart than half the diagonal of
    /// the search image.
    pub fn find_all(
        &self,
        source: &Image,
        search: &Image,
        max_count: usize,
    ) -> LocateResult<Vec<MatchResult>> {
        self.config.validate()?;
        if search.width() > source.width() || search.height() > source.height() {
            return Err(LocateError::SearchLargerThanSource {
                search_width: search.width(),
                search_height: search.height(),
                source_width: source.width(),
                source_height: source.height(),
            });
        }

        let _span = trace_span!(
            "find_all_template",
            width = search.width(),
            height = search.height(),
            max_count = max_count
        )
        .entered();

        let mode = self.config.channels;
        let preprocess = self.preprocess.as_deref();
        let template = Template::prepare(search, mode, preprocess)?;
        let planes = split_planes(source, mode, preprocess)?;
        let mut field = correlate_planes(&planes, &template, &mode.weights())?;

        let threshold = self.config.threshold;
        let (w, h) = (template.width(), template.height());
        let radius = half_diagonal(w, h);
        let mut results = Vec::new();
        loop {
            let Some(peak) = field.best() else {
                break;
            };
            if peak.score < threshold {
                trace_event!("template_stop", best = peak.score, found = results.len());
                break;
            }
            let center = Point::new((peak.x + w / 2) as i32, (peak.y + h / 2) as i32);
            trace_debug!(
                "template_match",
                x = center.x,
                y = center.y,
                score = peak.score
            );
            results.push(MatchResult {
                center,
                score: peak.score,
                region: None,
            });
            if max_count != 0 && results.len() >= max_count {
                break;
            }
            field.flood_fill_suppress(
                peak.x,
                peak.y,
                peak.score - threshold + FLOOD_MARGIN,
                FLOOD_UP,
                SUPPRESSED,
            );
            field.suppress_radius(peak.x, peak.y, radius, SUPPRESSED);
        }

        trace_event!("template_done", matches = results.len());
        Ok(results)
    }

    /// Best match at or above the threshold.
    pub fn find(&self, source: &Image, search: &Image) -> LocateResult<Option<MatchResult>> {
        Ok(self.find_all(source, search, 1)?.into_iter().next())
    }
}

/// Weighted sum of the per-plane ZNCC fields.
fn correlate_planes(
    planes: &[OwnedImage],
    template: &Template,
    weights: &[f32],
) -> LocateResult<SimilarityField> {
    let plans = template.plans();
    if planes.len() != plans.len() || planes.len() != weights.len() {
        return Err(LocateError::InvalidInput("plane count mismatch"));
    }

    #[cfg(feature = "rayon")]
    let fields = planes
        .par_iter()
        .zip(plans.par_iter())
        .map(|(plane, plan)| kernel::correlate(plane.view(), plan))
        .collect::<LocateResult<Vec<_>>>()?;
    #[cfg(not(feature = "rayon"))]
    let fields = planes
        .iter()
        .zip(plans)
        .map(|(plane, plan)| kernel::correlate(plane.view(), plan))
        .collect::<LocateResult<Vec<_>>>()?;

    let mut fields = fields.into_iter();
    let Some(first) = fields.next() else {
        return Err(LocateError::InvalidInput("no planes to correlate"));
    };
    if weights.len() == 1 {
        return Ok(first);
    }
    let (width, height) = (first.width(), first.height());
    let mut acc = SimilarityField::new(vec![0.0; width * height], width, height, Polarity::HigherIsBetter)?;
    acc.add_weighted(&first, weights[0])?;
    for (field, &weight) in fields.zip(&weights[1..]) {
        acc.add_weighted(&field, weight)?;
    }
    Ok(acc)
}

/// Template matching with explicit options; see [`TemplateMatcher::find_all`].
pub fn find_all_template(
    source: &Image,
    search: &Image,
    threshold: f32,
    max_count: usize,
    use_color: bool,
    remove_background: bool,
) -> LocateResult<Vec<MatchResult>> {
    let config = TemplateConfig::default()
        .with_threshold(threshold)
        .with_color(use_color)
        .with_remove_background(remove_background);
    TemplateMatcher::new(config).find_all(source, search, max_count)
}

/// Single best template match; see [`find_all_template`].
pub fn find_template(
    source: &Image,
    search: &Image,
    threshold: f32,
    use_color: bool,
    remove_background: bool,
) -> LocateResult<Option<MatchResult>> {
    Ok(find_all_template(source, search, threshold, 1, use_color, remove_background)?
        .into_iter()
        .next())
}

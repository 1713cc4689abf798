//! Search-image preparation for correlation.
//!
//! A `Template` is the search image split into the planes the matcher
//! correlates (one gray plane, or R/G/B planes in colour mode), after any
//! preprocessing, together with a precomputed plan per plane.

use crate::image::{Image, OwnedImage};
use crate::preprocess::Preprocess;
use crate::util::{LocateError, LocateResult};

mod plan;

pub use plan::TemplatePlan;

/// Per-channel weights for colour correlation, in R, G, B order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelWeights([f32; 3]);

impl ChannelWeights {
    /// Validates weights: finite, non-negative, summing to 1.
    pub fn new(weights: [f32; 3]) -> LocateResult<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(LocateError::InvalidInput(
                "channel weights must be finite and non-negative",
            ));
        }
        let total: f32 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-3 {
            return Err(LocateError::InvalidInput("channel weights must sum to 1"));
        }
        Ok(Self(weights))
    }

    pub fn get(&self) -> [f32; 3] {
        self.0
    }
}

impl Default for ChannelWeights {
    /// Red weighted slightly above green and blue.
    fn default() -> Self {
        Self([0.4, 0.3, 0.3])
    }
}

/// Which planes are correlated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChannelMode {
    /// Single luma plane.
    Gray,
    /// Weighted sum of the R, G and B plane correlations.
    Color(ChannelWeights),
}

impl ChannelMode {
    /// Weights aligned with the planes returned by [`split_planes`].
    pub fn weights(&self) -> Vec<f32> {
        match self {
            ChannelMode::Gray => vec![1.0],
            ChannelMode::Color(weights) => weights.get().to_vec(),
        }
    }
}

/// Splits an image into the planes correlated under `mode` and preprocesses them.
pub fn split_planes(
    image: &Image,
    mode: ChannelMode,
    preprocess: Option<&dyn Preprocess>,
) -> LocateResult<Vec<OwnedImage>> {
    let planes = match mode {
        ChannelMode::Gray => vec![image.to_gray()],
        ChannelMode::Color(_) => image.to_rgb_planes().into(),
    };
    match preprocess {
        Some(filter) => planes.iter().map(|plane| filter.apply(plane)).collect(),
        None => Ok(planes),
    }
}

/// Search image prepared for correlation.
pub struct Template {
    width: usize,
    height: usize,
    plans: Vec<TemplatePlan>,
}

impl Template {
    /// Prepares `search` for correlation under `mode`.
    pub fn prepare(
        search: &Image,
        mode: ChannelMode,
        preprocess: Option<&dyn Preprocess>,
    ) -> LocateResult<Self> {
        let planes = split_planes(search, mode, preprocess)?;
        let plans = planes
            .iter()
            .map(|plane| TemplatePlan::from_view(plane.view()))
            .collect::<LocateResult<Vec<_>>>()?;
        Ok(Self {
            width: search.width(),
            height: search.height(),
            plans,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Plans in plane order.
    pub fn plans(&self) -> &[TemplatePlan] {
        &self.plans
    }
}

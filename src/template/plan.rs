//! Template plan precomputation for ZNCC.

use crate::image::ImageView;
use crate::util::{LocateError, LocateResult};

/// Precomputed statistics for one template plane.
///
/// Sums are kept as exact integers so the correlation numerator and the
/// variance terms can be formed without cancellation error; a flat template
/// is detected exactly rather than through an epsilon.
pub struct TemplatePlan {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    sum: u64,
    /// `n * sum(t^2) - sum(t)^2`, i.e. `n^2` times the variance.
    var_num: u128,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> LocateResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(LocateError::InvalidDimensions { width, height })?;

        let mut pixels = Vec::with_capacity(count);
        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for y in 0..height {
            let row = tpl.row(y).ok_or_else(|| LocateError::BufferTooSmall {
                needed: y.saturating_mul(tpl.stride()).saturating_add(width),
                got: tpl.as_slice().len(),
            })?;
            for &value in row {
                let v = u64::from(value);
                sum += v;
                sum_sq += v * v;
            }
            pixels.extend_from_slice(row);
        }

        let n = count as u128;
        let sum_wide = u128::from(sum);
        let var_num = n * u128::from(sum_sq) - sum_wide * sum_wide;
        Ok(Self {
            width,
            height,
            pixels,
            sum,
            var_num,
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

    /// Returns the template pixels in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the number of template pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Returns `n^2` times the template variance.
    pub fn var_num(&self) -> u128 {
        self.var_num
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f64 {
        self.sum as f64 / self.pixels.len() as f64
    }

    /// True when every template pixel has the same value.
    pub fn is_flat(&self) -> bool {
        self.var_num == 0
    }
}

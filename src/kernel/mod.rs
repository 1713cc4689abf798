//! Correlation kernels producing dense similarity fields.
//!
//! The only metric is zero-mean normalized cross-correlation (ZNCC), which
//! lies in `[-1, 1]` with higher values meaning a better match. Window sums
//! come from exact integer integral images; only the template/window dot
//! product is evaluated per placement.

use crate::field::SimilarityField;
use crate::template::TemplatePlan;
use crate::util::{LocateError, LocateResult};
use crate::ImageView;

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Kernel trait for per-placement scoring and full-field evaluation.
pub trait Kernel {
    /// Computes the score at a single placement (top-left coordinates).
    fn score_at(
        image: ImageView<'_, u8>,
        sums: &IntegralSums,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> f32;

    /// Scores every valid placement.
    fn correlate(image: ImageView<'_, u8>, plan: &TemplatePlan) -> LocateResult<SimilarityField>;
}

/// Integral images of pixel values and squared pixel values.
pub struct IntegralSums {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralSums {
    /// Builds `(w + 1) x (h + 1)` integral tables for `image`.
    pub fn build(image: ImageView<'_, u8>) -> Self {
        let width = image.width();
        let height = image.height();
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let row = image.row(y).unwrap_or(&[]);
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for (x, &value) in row.iter().enumerate() {
                let v = u64::from(value);
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// Returns `(sum, sum of squares)` over the window at `(x, y)`.
    pub fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (u64, u64) {
        let s = self.stride;
        let a = y * s + x;
        let b = y * s + x + width;
        let c = (y + height) * s + x;
        let d = (y + height) * s + x + width;
        (
            self.sum[d] + self.sum[a] - self.sum[b] - self.sum[c],
            self.sum_sq[d] + self.sum_sq[a] - self.sum_sq[b] - self.sum_sq[c],
        )
    }
}

/// Checks that the template fits and returns the field dimensions.
pub(crate) fn field_dims(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> LocateResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(LocateError::SearchLargerThanSource {
            search_width: tpl_width,
            search_height: tpl_height,
            source_width: img_width,
            source_height: img_height,
        });
    }
    Ok((img_width - tpl_width + 1, img_height - tpl_height + 1))
}

/// ZNCC from exact integer moments.
///
/// `dot` is `sum(t * i)` over the window. Flat windows and templates have no
/// defined correlation: two flat patches score by closeness of their means,
/// a flat patch against a textured one scores 0.
pub(crate) fn zncc_from_moments(plan: &TemplatePlan, win_sum: u64, win_sum_sq: u64, dot: u64) -> f32 {
    let n = plan.len() as u128;
    let win_sum_wide = u128::from(win_sum);
    let var_i = n * u128::from(win_sum_sq) - win_sum_wide * win_sum_wide;
    let var_t = plan.var_num();
    match (var_t == 0, var_i == 0) {
        (true, true) => {
            let mean_i = win_sum as f64 / n as f64;
            (1.0 - (plan.mean() - mean_i).abs() / 255.0) as f32
        }
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let cov = n as i128 * i128::from(dot) - i128::from(plan.sum()) * i128::from(win_sum);
            let denom = (var_t as f64 * var_i as f64).sqrt();
            let score = (cov as f64 / denom).clamp(-1.0, 1.0);
            score as f32
        }
    }
}

/// Correlates with the best kernel compiled in.
pub fn correlate(image: ImageView<'_, u8>, plan: &TemplatePlan) -> LocateResult<SimilarityField> {
    #[cfg(feature = "rayon")]
    {
        <self::rayon::ZnccRayon as Kernel>::correlate(image, plan)
    }
    #[cfg(not(feature = "rayon"))]
    {
        <scalar::ZnccScalar as Kernel>::correlate(image, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::{zncc_from_moments, IntegralSums};
    use crate::template::TemplatePlan;
    use crate::ImageView;

    #[test]
    fn integral_window_matches_direct_sum() {
        let data: Vec<u8> = (0u8..20).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();
        let sums = IntegralSums::build(view);
        let (sum, sum_sq) = sums.window(1, 1, 3, 2);
        let expected: Vec<u64> = vec![6, 7, 8, 11, 12, 13];
        assert_eq!(sum, expected.iter().sum::<u64>());
        assert_eq!(sum_sq, expected.iter().map(|v| v * v).sum::<u64>());
    }

    #[test]
    fn flat_pairs_score_by_mean() {
        let tpl = [200u8; 4];
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        assert_eq!(zncc_from_moments(&plan, 800, 4 * 200 * 200, 0), 1.0);
        let score = zncc_from_moments(&plan, 4 * 149, 4 * 149 * 149, 0);
        assert!((score - 0.8).abs() < 1e-6);
        assert_eq!(zncc_from_moments(&plan, 1 + 2 + 3 + 4, 1 + 4 + 9 + 16, 0), 0.0);
    }

    #[test]
    fn screen_sized_self_match_scores_one() {
        let (width, height) = (4300, 4300);
        let data: Vec<u8> = (0..width * height)
            .map(|i| ((i * 37 + (i / width) * 11) % 251) as u8)
            .collect();
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        let sum: u64 = data.iter().map(|&v| u64::from(v)).sum();
        let sum_sq: u64 = data.iter().map(|&v| u64::from(v) * u64::from(v)).sum();
        let score = zncc_from_moments(&plan, sum, sum_sq, sum_sq);
        assert!((score - 1.0).abs() < 1e-5, "score {score}");

        let inverted: u64 = data
            .iter()
            .map(|&v| u64::from(v) * u64::from(255 - v))
            .sum();
        let inv_sum = 255 * data.len() as u64 - sum;
        let inv_sq: u64 = data.iter().map(|&v| u64::from(255 - v).pow(2)).sum();
        let score = zncc_from_moments(&plan, inv_sum, inv_sq, inverted);
        assert!((score + 1.0).abs() < 1e-5, "score {score}");
    }
}

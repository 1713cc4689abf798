//! Scalar reference kernel for ZNCC fields.

use crate::field::{Polarity, SimilarityField};
use crate::kernel::{field_dims, zncc_from_moments, IntegralSums, Kernel};
use crate::template::TemplatePlan;
use crate::util::LocateResult;
use crate::ImageView;

/// Single-threaded ZNCC kernel.
pub struct ZnccScalar;

/// Sum of `t * i` over the window at `(x, y)`.
pub(crate) fn window_dot(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
    let tpl_width = plan.width();
    let pixels = plan.pixels();
    let mut dot = 0u64;
    for ty in 0..plan.height() {
        let Some(img_row) = image.row(y + ty) else {
            break;
        };
        let tpl_row = &pixels[ty * tpl_width..(ty + 1) * tpl_width];
        let win = &img_row[x..x + tpl_width];
        let mut row_dot = 0u64;
        for (&t, &i) in tpl_row.iter().zip(win) {
            row_dot += u64::from(u32::from(t) * u32::from(i));
        }
        dot += row_dot;
    }
    dot
}

impl Kernel for ZnccScalar {
    fn score_at(
        image: ImageView<'_, u8>,
        sums: &IntegralSums,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> f32 {
        if x + plan.width() > image.width() || y + plan.height() > image.height() {
            return f32::NEG_INFINITY;
        }
        let (win_sum, win_sum_sq) = sums.window(x, y, plan.width(), plan.height());
        let dot = if plan.is_flat() {
            0
        } else {
            window_dot(image, plan, x, y)
        };
        zncc_from_moments(plan, win_sum, win_sum_sq, dot)
    }

    fn correlate(image: ImageView<'_, u8>, plan: &TemplatePlan) -> LocateResult<SimilarityField> {
        let (field_width, field_height) = field_dims(image, plan)?;
        let sums = IntegralSums::build(image);
        let mut data = Vec::with_capacity(field_width * field_height);
        for y in 0..field_height {
            for x in 0..field_width {
                data.push(Self::score_at(image, &sums, plan, x, y));
            }
        }
        SimilarityField::new(data, field_width, field_height, Polarity::HigherIsBetter)
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccScalar;
    use crate::kernel::Kernel;
    use crate::template::TemplatePlan;
    use crate::util::LocateError;
    use crate::ImageView;

    fn make_image(width: usize, height: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        data
    }

    #[test]
    fn zncc_field_matches_bruteforce() {
        let (img_width, img_height) = (9, 7);
        let image = make_image(img_width, img_height);
        let tpl: Vec<u8> = vec![3, 80, 17, 250, 41, 9];
        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 2).unwrap()).unwrap();

        let field = <ZnccScalar as Kernel>::correlate(image_view, &plan).unwrap();
        assert_eq!((field.width(), field.height()), (7, 6));

        let t: Vec<f64> = tpl.iter().map(|&v| v as f64).collect();
        let mean_t = t.iter().sum::<f64>() / 6.0;
        for y in 0..field.height() {
            for x in 0..field.width() {
                let mut w = Vec::new();
                for ty in 0..2 {
                    for tx in 0..3 {
                        w.push(image[(y + ty) * img_width + x + tx] as f64);
                    }
                }
                let mean_w = w.iter().sum::<f64>() / 6.0;
                let mut num = 0.0;
                let mut den_t = 0.0;
                let mut den_w = 0.0;
                for (a, b) in t.iter().zip(&w) {
                    num += (a - mean_t) * (b - mean_w);
                    den_t += (a - mean_t) * (a - mean_t);
                    den_w += (b - mean_w) * (b - mean_w);
                }
                let expected = if den_w == 0.0 {
                    0.0
                } else {
                    num / (den_t * den_w).sqrt()
                };
                let got = field.get(x, y).unwrap() as f64;
                assert!((got - expected).abs() < 1e-5, "({x},{y}): {got} vs {expected}");
            }
        }
    }

    #[test]
    fn exact_crop_scores_one() {
        let (img_width, img_height) = (12, 10);
        let image = make_image(img_width, img_height);
        let view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let crop = view.roi(4, 3, 5, 4).unwrap();
        let plan = TemplatePlan::from_view(crop).unwrap();
        let field = <ZnccScalar as Kernel>::correlate(view, &plan).unwrap();
        let best = field.best().unwrap();
        assert_eq!((best.x, best.y), (4, 3));
        assert!(best.score > 0.9999);
    }

    #[test]
    fn oversized_template_is_rejected() {
        let image = make_image(4, 4);
        let tpl = make_image(5, 2);
        let view = ImageView::from_slice(&image, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 5, 2).unwrap()).unwrap();
        let err = <ZnccScalar as Kernel>::correlate(view, &plan).err().unwrap();
        assert!(matches!(err, LocateError::SearchLargerThanSource { .. }));
    }
}

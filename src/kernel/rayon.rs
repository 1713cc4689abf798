//! Rayon-parallel ZNCC kernel (feature-gated).
//!
//! Rows of the field are independent, so each worker fills whole rows and the
//! results are concatenated in order. Output is identical to the scalar kernel.

use crate::field::{Polarity, SimilarityField};
use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{field_dims, IntegralSums, Kernel};
use crate::template::TemplatePlan;
use crate::util::LocateResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel ZNCC kernel.
pub struct ZnccRayon;

impl Kernel for ZnccRayon {
    fn score_at(
        image: ImageView<'_, u8>,
        sums: &IntegralSums,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> f32 {
        <ZnccScalar as Kernel>::score_at(image, sums, plan, x, y)
    }

    fn correlate(image: ImageView<'_, u8>, plan: &TemplatePlan) -> LocateResult<SimilarityField> {
        let (field_width, field_height) = field_dims(image, plan)?;
        let sums = IntegralSums::build(image);
        let mut data = vec![0.0f32; field_width * field_height];
        data.par_chunks_mut(field_width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = Self::score_at(image, &sums, plan, x, y);
                }
            });
        SimilarityField::new(data, field_width, field_height, Polarity::HigherIsBetter)
    }
}

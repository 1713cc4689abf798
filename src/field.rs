//! Dense similarity fields produced by correlation kernels.
//!
//! A field holds one score per valid template placement (top-left
//! coordinates), row-major. Whether a larger score means a better match
//! depends on the metric, so every field carries its `Polarity` and extremum
//! lookup honours it.
//!
//! Suppression methods mutate the field in place. The extraction loop owns the
//! only copy of its field, so nothing else observes the disqualified values.

use crate::util::{LocateError, LocateResult};

/// Which direction of the score scale indicates a better match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Best-scoring placement in a field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extremum {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

/// 2D grid of placement scores.
#[derive(Clone, Debug)]
pub struct SimilarityField {
    data: Vec<f32>,
    width: usize,
    height: usize,
    polarity: Polarity,
}

impl SimilarityField {
    /// Wraps a row-major score buffer.
    pub fn new(
        data: Vec<f32>,
        width: usize,
        height: usize,
        polarity: Polarity,
    ) -> LocateResult<Self> {
        let needed = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(LocateError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(LocateError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            polarity,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns the row-major scores.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the score at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Finds the best placement according to the field polarity.
    ///
    /// Ties resolve to the first placement in row-major order. NaN scores are
    /// ignored; a field made only of NaN has no extremum.
    pub fn best(&self) -> Option<Extremum> {
        let mut best: Option<Extremum> = None;
        for (idx, &score) in self.data.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => match self.polarity {
                    Polarity::HigherIsBetter => score > current.score,
                    Polarity::LowerIsBetter => score < current.score,
                },
            };
            if better {
                best = Some(Extremum {
                    x: idx % self.width,
                    y: idx / self.width,
                    score,
                });
            }
        }
        best
    }

    /// Accumulates `weight * other` into this field.
    pub(crate) fn add_weighted(&mut self, other: &SimilarityField, weight: f32) -> LocateResult<()> {
        if other.width != self.width || other.height != self.height {
            return Err(LocateError::InvalidInput("field sizes differ"));
        }
        for (dst, &src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst += weight * src;
        }
        Ok(())
    }

    /// Overwrites the 4-connected region around `(seed_x, seed_y)` with `fill`.
    ///
    /// The region is every placement reachable from the seed through
    /// neighbours whose score lies in the fixed range
    /// `[seed - lo_diff, seed + up_diff]`, where `seed` is the score at the
    /// seed. Returns the number of placements overwritten; a seed outside the
    /// field or with a NaN score overwrites nothing.
    pub fn flood_fill_suppress(
        &mut self,
        seed_x: usize,
        seed_y: usize,
        lo_diff: f32,
        up_diff: f32,
        fill: f32,
    ) -> usize {
        let Some(seed) = self.get(seed_x, seed_y).filter(|s| !s.is_nan()) else {
            return 0;
        };
        let lo = seed - lo_diff;
        let hi = seed + up_diff;
        let in_range = |v: f32| v >= lo && v <= hi;
        let width = self.width;

        let mut visited = vec![false; self.data.len()];
        let mut stack = vec![(seed_x, seed_y)];
        visited[seed_y * width + seed_x] = true;
        let mut filled = 0usize;

        while let Some((x, y)) = stack.pop() {
            let idx = y * width + x;
            self.data[idx] = fill;
            filled += 1;

            let mut visit = |nx: usize, ny: usize, data: &[f32]| {
                let nidx = ny * width + nx;
                if !visited[nidx] && in_range(data[nidx]) {
                    visited[nidx] = true;
                    stack.push((nx, ny));
                }
            };
            if x > 0 {
                visit(x - 1, y, &self.data);
            }
            if x + 1 < width {
                visit(x + 1, y, &self.data);
            }
            if y > 0 {
                visit(x, y - 1, &self.data);
            }
            if y + 1 < self.height {
                visit(x, y + 1, &self.data);
            }
        }

        filled
    }

    /// Overwrites every placement within Euclidean `radius` of `(cx, cy)`.
    pub fn suppress_radius(&mut self, cx: usize, cy: usize, radius: f32, fill: f32) {
        if radius < 0.0 || !radius.is_finite() {
            return;
        }
        let reach = radius.floor() as usize;
        let x0 = cx.saturating_sub(reach);
        let y0 = cy.saturating_sub(reach);
        let x1 = cx.saturating_add(reach).min(self.width.saturating_sub(1));
        let y1 = cy.saturating_add(reach).min(self.height.saturating_sub(1));
        let r2 = radius * radius;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - cx as f32;
                let dy = y as f32 - cy as f32;
                if dx * dx + dy * dy <= r2 {
                    self.data[y * self.width + x] = fill;
                }
            }
        }
    }
}

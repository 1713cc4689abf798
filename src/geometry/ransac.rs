//! RANSAC homography fitting.
//!
//! Minimal samples of four correspondences are drawn with a seeded RNG, so a
//! given input always produces the same fit. The best hypothesis (most
//! inliers) is refit on all of its inliers with the normalized DLT.

use crate::geometry::Homography;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

const SAMPLE_SIZE: usize = 4;

/// Configuration for robust homography fitting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacConfig {
    /// Maximum reprojection error in pixels for a correspondence to count
    /// as an inlier.
    pub threshold: f64,
    /// Upper bound on hypotheses evaluated.
    pub max_iterations: usize,
    /// Desired probability of drawing at least one all-inlier sample; used to
    /// stop early.
    pub confidence: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0x5eed_cafe,
        }
    }
}

/// Result of a successful robust fit.
#[derive(Clone, Debug, PartialEq)]
pub struct RansacFit {
    pub homography: Homography,
    /// Inlier flag per input correspondence.
    pub inliers: Vec<bool>,
}

impl RansacFit {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }

    /// Fraction of correspondences that are inliers.
    pub fn inlier_ratio(&self) -> f32 {
        if self.inliers.is_empty() {
            return 0.0;
        }
        self.inlier_count() as f32 / self.inliers.len() as f32
    }
}

/// Fits a homography mapping `src[i]` to `dst[i]` while tolerating outliers.
///
/// Returns `None` when fewer than four correspondences are given or no
/// non-degenerate hypothesis gathers at least four inliers.
pub fn fit_homography_ransac(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    cfg: &RansacConfig,
) -> Option<RansacFit> {
    let n = src.len();
    if n < SAMPLE_SIZE || n != dst.len() {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut best: Option<(Homography, usize)> = None;
    let mut needed = cfg.max_iterations;
    let mut iteration = 0usize;

    while iteration < needed.min(cfg.max_iterations) {
        iteration += 1;
        let idx = sample(&mut rng, n, SAMPLE_SIZE).into_vec();
        let s: Vec<_> = idx.iter().map(|&i| src[i]).collect();
        let d: Vec<_> = idx.iter().map(|&i| dst[i]).collect();
        if has_collinear_triple(&s) || has_collinear_triple(&d) {
            continue;
        }
        let Some(h) = Homography::estimate(&s, &d) else {
            continue;
        };
        let count = count_inliers(&h, src, dst, cfg.threshold);
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((h, count));
            needed = adaptive_iterations(count, n, cfg.confidence).max(iteration);
        }
    }

    let (mut homography, count) = best?;
    if count < SAMPLE_SIZE {
        return None;
    }

    let mut inliers = inlier_mask(&homography, src, dst, cfg.threshold);
    let (s, d): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst)
        .zip(&inliers)
        .filter(|(_, &keep)| keep)
        .map(|((&s, &d), _)| (s, d))
        .unzip();
    if let Some(refit) = Homography::estimate(&s, &d) {
        let refit_mask = inlier_mask(&refit, src, dst, cfg.threshold);
        if refit_mask.iter().filter(|&&b| b).count() >= count {
            homography = refit;
            inliers = refit_mask;
        }
    }

    Some(RansacFit {
        homography,
        inliers,
    })
}

fn count_inliers(h: &Homography, src: &[(f64, f64)], dst: &[(f64, f64)], threshold: f64) -> usize {
    src.iter()
        .zip(dst)
        .filter(|(&s, &d)| h.reprojection_error(s, d) <= threshold)
        .count()
}

fn inlier_mask(h: &Homography, src: &[(f64, f64)], dst: &[(f64, f64)], threshold: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(&s, &d)| h.reprojection_error(s, d) <= threshold)
        .collect()
}

/// Iterations needed to draw an all-inlier sample with `confidence`.
fn adaptive_iterations(inliers: usize, total: usize, confidence: f64) -> usize {
    let w = inliers as f64 / total as f64;
    let p_good = w.powi(SAMPLE_SIZE as i32);
    if p_good >= 1.0 - f64::EPSILON {
        return 1;
    }
    if p_good <= f64::EPSILON {
        return usize::MAX;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if k.is_finite() && k >= 0.0 {
        k.ceil() as usize
    } else {
        usize::MAX
    }
}

fn has_collinear_triple(pts: &[(f64, f64)]) -> bool {
    for i in 0..pts.len() {
        for j in i + 1..pts.len() {
            for k in j + 1..pts.len() {
                let (a, b, c) = (pts[i], pts[j], pts[k]);
                let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
                if cross.abs() < 1e-6 {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::{fit_homography_ransac, RansacConfig};

    fn grid() -> Vec<(f64, f64)> {
        let mut pts = Vec::new();
        for y in 0..5 {
            for x in 0..6 {
                pts.push((x as f64 * 10.0 + (y % 2) as f64 * 3.0, y as f64 * 8.0));
            }
        }
        pts
    }

    #[test]
    fn ransac_ignores_outliers() {
        let src = grid();
        let mut dst: Vec<_> = src.iter().map(|&(x, y)| (x + 100.0, y + 50.0)).collect();
        for (i, p) in dst.iter_mut().enumerate().filter(|(i, _)| i % 5 == 0) {
            *p = (p.0 - 37.0 * i as f64 % 23.0, p.1 + 41.0);
        }
        let fit = fit_homography_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(fit.inlier_count(), src.len() - 6);
        for (i, &inlier) in fit.inliers.iter().enumerate() {
            assert_eq!(inlier, i % 5 != 0, "index {i}");
        }
        let (x, y) = fit.homography.project(0.0, 0.0).unwrap();
        assert!((x - 100.0).abs() < 1e-6 && (y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn ransac_is_deterministic() {
        let src = grid();
        let dst: Vec<_> = src.iter().map(|&(x, y)| (2.0 * x - y, x + y)).collect();
        let cfg = RansacConfig::default();
        let a = fit_homography_ransac(&src, &dst, &cfg).unwrap();
        let b = fit_homography_ransac(&src, &dst, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ransac_fails_on_collinear_points() {
        let src: Vec<_> = (0..10).map(|i| (i as f64, 2.0 * i as f64)).collect();
        let dst = src.clone();
        assert!(fit_homography_ransac(&src, &dst, &RansacConfig::default()).is_none());
        assert!(fit_homography_ransac(&src[..3], &dst[..3], &RansacConfig::default()).is_none());
    }
}

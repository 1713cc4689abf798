//! Projective transform estimation with the normalized DLT.

use nalgebra::{Matrix3, SMatrix, SymmetricEigen};

/// Smallest usable `|w|` when dehomogenizing a projected point.
const MIN_W: f64 = 1e-10;

/// 3x3 projective transform normalized so that `h[(2, 2)] == 1` when possible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Wraps a matrix; rejects non-finite or all-zero matrices.
    pub fn from_matrix(m: Matrix3<f64>) -> Option<Self> {
        if m.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let scale = m[(2, 2)];
        if scale.abs() > MIN_W {
            return Some(Self(m / scale));
        }
        let norm = m.norm();
        if norm <= MIN_W {
            return None;
        }
        Some(Self(m / norm))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Maps `(x, y)`; `None` for points sent to (or near) infinity.
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.0;
        let w = m[(2, 0)] * x + m[(2, 1)] * y + m[(2, 2)];
        if w.abs() <= MIN_W {
            return None;
        }
        let px = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
        let py = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
        (px.is_finite() && py.is_finite()).then_some((px, py))
    }

    /// Euclidean distance between `h(src)` and `dst`; infinite when unmappable.
    pub fn reprojection_error(&self, src: (f64, f64), dst: (f64, f64)) -> f64 {
        match self.project(src.0, src.1) {
            Some((x, y)) => ((x - dst.0).powi(2) + (y - dst.1).powi(2)).sqrt(),
            None => f64::INFINITY,
        }
    }

    /// Least-squares fit from at least four correspondences.
    ///
    /// Both point sets are normalized (centroid at the origin, mean distance
    /// `sqrt(2)`) before solving, and the solution is the eigenvector of
    /// `A^T A` with the smallest eigenvalue. Returns `None` for fewer than
    /// four points, coincident points, or a singular result.
    pub fn estimate(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Self> {
        if src.len() < 4 || src.len() != dst.len() {
            return None;
        }
        let t_src = normalizing_transform(src)?;
        let t_dst = normalizing_transform(dst)?;

        let mut ata = SMatrix::<f64, 9, 9>::zeros();
        for (&s, &d) in src.iter().zip(dst) {
            let (x, y) = apply(&t_src, s);
            let (u, v) = apply(&t_dst, d);
            let rows = [
                [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u],
                [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v],
            ];
            for row in &rows {
                for i in 0..9 {
                    for j in 0..9 {
                        ata[(i, j)] += row[i] * row[j];
                    }
                }
            }
        }

        let eig = SymmetricEigen::new(ata);
        let h = eig.eigenvectors.column(eig.eigenvalues.imin());
        let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
        let t_dst_inv = t_dst.try_inverse()?;
        let m = t_dst_inv * h_norm * t_src;
        if m.determinant().abs() <= f64::EPSILON {
            return None;
        }
        Self::from_matrix(m)
    }
}

fn apply(t: &Matrix3<f64>, p: (f64, f64)) -> (f64, f64) {
    (
        t[(0, 0)] * p.0 + t[(0, 2)],
        t[(1, 1)] * p.1 + t[(1, 2)],
    )
}

/// Similarity transform moving the centroid to the origin and scaling the
/// mean distance from it to `sqrt(2)`.
fn normalizing_transform(points: &[(f64, f64)]) -> Option<Matrix3<f64>> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist <= 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::Homography;
    use nalgebra::Matrix3;

    fn project_all(h: &Homography, pts: &[(f64, f64)]) -> Vec<(f64, f64)> {
        pts.iter().map(|&(x, y)| h.project(x, y).unwrap()).collect()
    }

    #[test]
    fn estimate_recovers_perspective_transform() {
        let truth = Homography::from_matrix(Matrix3::new(
            0.9, -0.2, 40.0, 0.15, 1.1, 25.0, 0.0005, -0.0003, 1.0,
        ))
        .unwrap();
        let src = [
            (0.0, 0.0),
            (50.0, 0.0),
            (50.0, 40.0),
            (0.0, 40.0),
            (20.0, 13.0),
            (35.0, 31.0),
        ];
        let dst = project_all(&truth, &src);
        let fit = Homography::estimate(&src, &dst).unwrap();
        for (&s, &d) in src.iter().zip(&dst) {
            assert!(fit.reprojection_error(s, d) < 1e-6);
        }
        let diff = fit.matrix() - truth.matrix();
        assert!(diff.norm() < 1e-6);
    }

    #[test]
    fn estimate_rejects_too_few_or_coincident_points() {
        let pts = [(1.0, 1.0); 4];
        assert!(Homography::estimate(&pts, &pts).is_none());
        let three = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        assert!(Homography::estimate(&three, &three).is_none());
    }

    #[test]
    fn project_rejects_points_at_infinity() {
        let h = Homography::from_matrix(Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0))
            .unwrap();
        assert!(h.project(0.0, 5.0).is_none());
        assert_eq!(Homography::identity().project(3.0, 4.0), Some((3.0, 4.0)));
    }
}

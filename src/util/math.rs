//! Small numeric helpers shared by the matchers.

/// BT.601 luma from 8-bit RGB, rounded to nearest.
pub(crate) fn luma_bt601(r: u8, g: u8, b: u8) -> u8 {
    let sum = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((sum + 500) / 1000) as u8
}

/// Half of the diagonal of a `width` x `height` rectangle.
pub(crate) fn half_diagonal(width: usize, height: usize) -> f32 {
    let w = width as f32;
    let h = height as f32;
    (w * w + h * h).sqrt() * 0.5
}

/// Wraps an angle in radians to `[-pi, pi)`.
pub(crate) fn wrap_rad(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut wrapped = angle % TAU;
    if wrapped < -PI {
        wrapped += TAU;
    }
    if wrapped >= PI {
        wrapped -= TAU;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::{half_diagonal, luma_bt601, wrap_rad};

    #[test]
    fn luma_preserves_gray_levels() {
        assert_eq!(luma_bt601(0, 0, 0), 0);
        assert_eq!(luma_bt601(255, 255, 255), 255);
        assert_eq!(luma_bt601(128, 128, 128), 128);
    }

    #[test]
    fn luma_weights_green_highest() {
        assert!(luma_bt601(0, 200, 0) > luma_bt601(200, 0, 0));
        assert!(luma_bt601(200, 0, 0) > luma_bt601(0, 0, 200));
    }

    #[test]
    fn half_diagonal_of_3_4_box() {
        assert!((half_diagonal(3, 4) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn wrap_rad_maps_to_expected_range() {
        use std::f32::consts::PI;
        assert!((wrap_rad(1.5 * PI) + 0.5 * PI).abs() < 1e-5);
        assert!((wrap_rad(-1.5 * PI) - 0.5 * PI).abs() < 1e-5);
        assert!((wrap_rad(0.25) - 0.25).abs() < 1e-6);
    }
}

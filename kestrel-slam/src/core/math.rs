//! Mathematical primitives for 2D SLAM operations.
//!
//! Angle normalization, tolerance comparisons, and the univariate
//! Gaussian density used by the likelihood models.

use std::f32::consts::PI;

/// Absolute tolerance for [`almost_equal`].
pub const DEFAULT_TOLERANCE: f64 = 1.0e-12;

/// Normalize angle to (-π, π].
///
/// # Example
/// ```
/// use kestrel_slam::core::math::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-5);
/// assert!((normalize_angle(-PI) - PI).abs() < 1e-6);
/// ```
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Normalize angle to (-π, π], double precision.
///
/// The proposal machinery accumulates pose moments in `f64`; wrapping
/// there must not round-trip through `f32`.
#[inline]
pub fn normalize_angle_f64(angle: f64) -> f64 {
    use std::f64::consts::PI as PI64;
    let mut a = angle % (2.0 * PI64);
    if a > PI64 {
        a -= 2.0 * PI64;
    } else if a <= -PI64 {
        a += 2.0 * PI64;
    }
    a
}

/// Shortest signed angular difference from `a` to `b`.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

/// Absolute-tolerance equality for guarding divisions and detecting
/// the straight-line motion case.
#[inline]
pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < DEFAULT_TOLERANCE
}

/// Density of the zero-mean univariate normal `N(0, var)` at `x`.
///
/// A vanishing variance collapses the distribution to a point mass:
/// the density degenerates to 1.0 at `x = 0` and 0.0 elsewhere, which
/// keeps stationary odometry steps finite.
pub fn gaussian_pdf(x: f64, var: f64) -> f64 {
    if var < DEFAULT_TOLERANCE {
        if x.abs() < 1.0e-9 {
            return 1.0;
        }
        return 0.0;
    }
    (-0.5 * x * x / var).exp() / (2.0 * std::f64::consts::PI * var).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_angle_identity() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
        assert_relative_eq!(normalize_angle(1.0), 1.0);
        assert_relative_eq!(normalize_angle(-1.0), -1.0);
    }

    #[test]
    fn test_normalize_angle_wraps() {
        assert_relative_eq!(normalize_angle(2.0 * PI), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-5);
        assert_relative_eq!(normalize_angle(-2.0 * PI), 0.0, epsilon = 1e-6);
        // rounded -3π sits just inside the open end, so it stays negative
        assert_relative_eq!(normalize_angle(-3.0 * PI), -PI, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_angle_half_open_interval() {
        assert_relative_eq!(normalize_angle(PI), PI, epsilon = 1e-6);
        let wrapped = normalize_angle(-PI);
        assert!(wrapped > 0.0, "-π should wrap to +π: {}", wrapped);

        let just_over = normalize_angle(PI + 0.001);
        assert!(just_over < 0.0, "π + ε should wrap negative: {}", just_over);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-6);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_angle_f64_matches_f32_semantics() {
        use std::f64::consts::PI as PI64;
        assert_relative_eq!(normalize_angle_f64(3.0 * PI64), PI64, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle_f64(-PI64), PI64, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle_f64(0.25), 0.25);
    }

    #[test]
    fn test_almost_equal() {
        assert!(almost_equal(0.0, 0.0));
        assert!(almost_equal(1.0, 1.0 + 1e-13));
        assert!(!almost_equal(1.0, 1.0 + 1e-9));
    }

    #[test]
    fn test_gaussian_pdf_peak() {
        // N(0, 1) at 0 is 1/sqrt(2π)
        assert_relative_eq!(
            gaussian_pdf(0.0, 1.0),
            1.0 / (2.0 * std::f64::consts::PI).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gaussian_pdf_symmetric_and_decreasing() {
        assert_relative_eq!(gaussian_pdf(0.5, 2.0), gaussian_pdf(-0.5, 2.0));
        assert!(gaussian_pdf(0.0, 1.0) > gaussian_pdf(1.0, 1.0));
        assert!(gaussian_pdf(1.0, 1.0) > gaussian_pdf(3.0, 1.0));
    }

    #[test]
    fn test_gaussian_pdf_zero_variance() {
        assert_relative_eq!(gaussian_pdf(0.0, 0.0), 1.0);
        assert_relative_eq!(gaussian_pdf(0.3, 0.0), 0.0);
    }
}

//! Gaussian sampling with deterministic seeding.
//!
//! The filter draws all of its randomness through one [`GaussianSampler`]
//! so that a fixed seed reproduces an entire run.

use nalgebra::{Matrix3, Vector3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{Result, SlamError};

/// Pivot tolerance for the positive semi-definite Cholesky.
const PSD_TOLERANCE: f64 = 1.0e-12;

/// Seedable source of Gaussian noise.
///
/// If seed is 0, uses random entropy for non-deterministic behavior.
/// Otherwise, uses the provided seed for reproducible results.
#[derive(Debug, Clone)]
pub struct GaussianSampler {
    rng: SmallRng,
}

impl GaussianSampler {
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// One draw from the standard normal `N(0, 1)`.
    #[inline]
    pub fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Three IID draws from `N(0, 1)`.
    #[inline]
    pub fn standard_normal_vec3(&mut self) -> Vector3<f64> {
        Vector3::new(
            self.standard_normal(),
            self.standard_normal(),
            self.standard_normal(),
        )
    }

    /// Draw from the multivariate normal `N(mean, cov)`.
    ///
    /// `cov` must be positive semi-definite; the draw is `mean + L z`
    /// with `L Lᵀ = cov` and `z` standard normal. A zero covariance
    /// returns `mean` exactly.
    pub fn sample_multivariate(
        &mut self,
        mean: &Vector3<f64>,
        cov: &Matrix3<f64>,
    ) -> Result<Vector3<f64>> {
        let l = cholesky_psd(cov)?;
        Ok(mean + l * self.standard_normal_vec3())
    }
}

/// Lower Cholesky factor of a positive semi-definite 3x3 matrix.
///
/// Unlike a strict `L Lᵀ` decomposition this tolerates zero pivots
/// (the corresponding column of `L` stays zero), which the filter
/// relies on: motion noise may be disabled entirely, and a proposal
/// covariance built from near-identical candidates is rank-deficient.
/// A pivot below `-PSD_TOLERANCE` means the matrix is indefinite and
/// is reported as an error.
pub fn cholesky_psd(cov: &Matrix3<f64>) -> Result<Matrix3<f64>> {
    let mut l = Matrix3::zeros();

    for j in 0..3 {
        let mut pivot = cov[(j, j)];
        for k in 0..j {
            pivot -= l[(j, k)] * l[(j, k)];
        }

        if pivot < -PSD_TOLERANCE {
            return Err(SlamError::NotPositiveDefinite);
        }
        if pivot <= PSD_TOLERANCE {
            // Semi-definite direction: no noise along this axis.
            continue;
        }

        let diag = pivot.sqrt();
        l[(j, j)] = diag;

        for i in (j + 1)..3 {
            let mut s = cov[(i, j)];
            for k in 0..j {
                s -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = s / diag;
        }
    }

    Ok(l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_deterministic_seed() {
        let mut a = GaussianSampler::new(42);
        let mut b = GaussianSampler::new(42);
        for _ in 0..100 {
            assert_eq!(a.standard_normal(), b.standard_normal());
        }
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut sampler = GaussianSampler::new(7);
        let n = 20_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let v = sampler.standard_normal();
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!(mean.abs() < 0.05, "mean: {}", mean);
        assert!((var - 1.0).abs() < 0.1, "var: {}", var);
    }

    #[test]
    fn test_cholesky_identity() {
        let l = cholesky_psd(&Matrix3::identity()).unwrap();
        assert_relative_eq!(l, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_diagonal() {
        let cov = Matrix3::from_diagonal(&Vector3::new(4.0, 9.0, 0.25));
        let l = cholesky_psd(&cov).unwrap();
        assert_relative_eq!(l[(0, 0)], 2.0);
        assert_relative_eq!(l[(1, 1)], 3.0);
        assert_relative_eq!(l[(2, 2)], 0.5);
    }

    #[test]
    fn test_cholesky_reconstructs() {
        let cov = Matrix3::new(
            4.0, 2.0, 0.6, //
            2.0, 5.0, 0.4, //
            0.6, 0.4, 3.0,
        );
        let l = cholesky_psd(&cov).unwrap();
        assert_relative_eq!(l * l.transpose(), cov, epsilon = 1e-10);
    }

    #[test]
    fn test_cholesky_zero_matrix() {
        let l = cholesky_psd(&Matrix3::zeros()).unwrap();
        assert_eq!(l, Matrix3::zeros());
    }

    #[test]
    fn test_cholesky_rank_deficient() {
        // One zero variance axis must not poison the others.
        let cov = Matrix3::from_diagonal(&Vector3::new(1.0, 0.0, 4.0));
        let l = cholesky_psd(&cov).unwrap();
        assert_relative_eq!(l * l.transpose(), cov, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_indefinite_fails() {
        let cov = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0));
        assert_eq!(cholesky_psd(&cov), Err(SlamError::NotPositiveDefinite));
    }

    #[test]
    fn test_sample_multivariate_zero_cov_is_mean() {
        let mut sampler = GaussianSampler::new(9);
        let mean = Vector3::new(0.5, -1.0, 2.0);
        let draw = sampler.sample_multivariate(&mean, &Matrix3::zeros()).unwrap();
        assert_eq!(draw, mean);
    }

    #[test]
    fn test_sample_multivariate_spread_tracks_cov() {
        let mut sampler = GaussianSampler::new(11);
        let mean = Vector3::zeros();
        let cov = Matrix3::from_diagonal(&Vector3::new(0.01, 1.0, 0.0));

        let n = 5000;
        let mut sum_sq = Vector3::zeros();
        for _ in 0..n {
            let d = sampler.sample_multivariate(&mean, &cov).unwrap();
            sum_sq += d.component_mul(&d);
        }
        let var = sum_sq / n as f64;
        assert!((var[0] - 0.01).abs() < 0.005, "var x: {}", var[0]);
        assert!((var[1] - 1.0).abs() < 0.1, "var y: {}", var[1]);
        assert_eq!(var[2], 0.0);
    }
}

//! Velocity motion model and odometry pose likelihood.
//!
//! Two pieces of the odometry machinery from Probabilistic Robotics
//! (Thrun et al.):
//!
//! - sampling a new pose from a commanded twist plus Gaussian process
//!   noise (§5.3, simplified to a planar arc), and
//! - scoring a pose transition against an odometry measurement via the
//!   rotation-translation-rotation decomposition (table 5.5).

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::math::{almost_equal, gaussian_pdf, normalize_angle, normalize_angle_f64};
use crate::core::sampling::GaussianSampler;
use crate::core::types::{Pose2D, Twist2D};
use crate::error::Result;

/// Diagonal of a 3x3 pose covariance, ordered (theta, x, y).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseDiagonal {
    /// Heading variance in rad².
    pub theta: f64,
    /// X variance in m².
    pub x: f64,
    /// Y variance in m².
    pub y: f64,
}

impl NoiseDiagonal {
    pub fn new(theta: f64, x: f64, y: f64) -> Self {
        Self { theta, x, y }
    }

    /// All-zero noise (deterministic motion, used in tests).
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// The diagonal as a full covariance matrix.
    pub fn as_covariance(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::new(self.theta, self.x, self.y))
    }
}

/// Noise coefficients of the odometry likelihood model.
///
/// Each alpha scales how much one motion component contaminates
/// another:
/// - `alpha1`: rotation noise from rotation (rad/rad)
/// - `alpha2`: rotation noise from translation (rad/m)
/// - `alpha3`: translation noise from translation (m/m)
/// - `alpha4`: translation noise from rotation (m/rad)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OdometryAlphas {
    pub alpha1: f64,
    pub alpha2: f64,
    pub alpha3: f64,
    pub alpha4: f64,
}

impl Default for OdometryAlphas {
    fn default() -> Self {
        // Conservative defaults for an indoor differential drive base
        Self {
            alpha1: 0.1,
            alpha2: 0.05,
            alpha3: 0.1,
            alpha4: 0.05,
        }
    }
}

/// Twist-driven motion model with additive Gaussian noise.
#[derive(Debug, Clone)]
pub struct MotionModel {
    noise: NoiseDiagonal,
}

impl MotionModel {
    pub fn new(noise: NoiseDiagonal) -> Self {
        Self { noise }
    }

    pub fn noise(&self) -> &NoiseDiagonal {
        &self.noise
    }

    /// Advance `pose` in place by one tick of twist `u` plus noise
    /// `w ~ N(0, Σ_motion)`.
    ///
    /// The heading is updated (and wrapped) before the translation, so
    /// the trigonometric terms see the new heading. A vanishing
    /// angular velocity takes the straight-line branch; otherwise the
    /// pose follows a circular arc of radius `vx / ω`.
    pub fn sample(&self, u: &Twist2D, pose: &mut Pose2D, sampler: &mut GaussianSampler) -> Result<()> {
        let w = sampler.sample_multivariate(&Vector3::zeros(), &self.noise.as_covariance())?;

        if almost_equal(u.omega as f64, 0.0) {
            pose.theta = normalize_angle(pose.theta + w[0] as f32);
            pose.x += u.vx * pose.theta.cos() + w[1] as f32;
            pose.y += u.vx * pose.theta.sin() + w[2] as f32;
        } else {
            let radius = u.vx / u.omega;
            pose.theta = normalize_angle(pose.theta + u.omega + w[0] as f32);
            pose.x += -radius * pose.theta.sin()
                + radius * (pose.theta + u.omega).sin()
                + w[1] as f32;
            pose.y += radius * pose.theta.cos()
                - radius * (pose.theta + u.omega).cos()
                + w[2] as f32;
        }

        Ok(())
    }
}

/// Odometry-based transition likelihood.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdometryModel {
    alphas: OdometryAlphas,
}

/// A pose delta decomposed into rotation-translation-rotation.
struct RotTransRot {
    rot1: f64,
    trans: f64,
    rot2: f64,
}

fn decompose(cur: &Vector3<f64>, prev: &Vector3<f64>) -> RotTransRot {
    // Vectors are ordered (theta, x, y)
    let rot1 = (cur[2] - prev[2]).atan2(cur[1] - prev[1]) - prev[0];
    let trans = ((cur[1] - prev[1]).powi(2) + (cur[2] - prev[2]).powi(2)).sqrt();
    let rot2 = wrap(wrap(cur[0]) - wrap(prev[0]) - rot1);
    RotTransRot { rot1, trans, rot2 }
}

#[inline]
fn wrap(angle: f64) -> f64 {
    normalize_angle_f64(angle)
}

impl OdometryModel {
    pub fn new(alphas: OdometryAlphas) -> Self {
        Self { alphas }
    }

    pub fn alphas(&self) -> &OdometryAlphas {
        &self.alphas
    }

    /// Probability of the transition `prev_pose → cur_pose` given the
    /// odometry measurement `prev_odom → cur_odom`.
    ///
    /// Both deltas are decomposed into (rot1, trans, rot2); the three
    /// discrepancies are scored as independent zero-mean Gaussians
    /// whose variances grow with the motion the candidate claims.
    /// Rotation discrepancies are wrapped on both sides of the
    /// subtraction so near-±π headings do not produce 2π jumps.
    pub fn likelihood(
        &self,
        cur_pose: &Vector3<f64>,
        prev_pose: &Vector3<f64>,
        cur_odom: &Vector3<f64>,
        prev_odom: &Vector3<f64>,
    ) -> f64 {
        let odom = decompose(cur_odom, prev_odom);
        let pose = decompose(cur_pose, prev_pose);

        let a = &self.alphas;
        let var1 = a.alpha1 * pose.rot1 * pose.rot1 + a.alpha2 * pose.trans * pose.trans;
        let var2 = a.alpha3 * pose.trans * pose.trans
            + a.alpha4 * (pose.rot1 * pose.rot1 + pose.rot2 * pose.rot2);
        let var3 = a.alpha1 * pose.rot2 * pose.rot2 + a.alpha2 * pose.trans * pose.trans;

        let p1 = gaussian_pdf(wrap(wrap(odom.rot1) - wrap(pose.rot1)), var1);
        let p2 = gaussian_pdf(odom.trans - pose.trans, var2);
        let p3 = gaussian_pdf(wrap(wrap(odom.rot2) - wrap(pose.rot2)), var3);

        p1 * p2 * p3
    }
}

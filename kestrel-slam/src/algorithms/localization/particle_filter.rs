//! Rao-Blackwellized particle filter for occupancy-grid SLAM.
//!
//! Each particle carries a full trajectory hypothesis: a pose and its
//! own occupancy grid. A step refines poses with a scan-matched
//! Gaussian proposal (sample around the matched mode, weight the
//! candidates by scan and odometry likelihood, fit mean and
//! covariance, draw), falls back to plain motion-model sampling when
//! the matcher rejects the scan, integrates the scan into every map,
//! and resamples when the effective sample size collapses.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::algorithms::mapping::OccupancyGrid;
use crate::algorithms::matching::ScanMatcher;
use crate::core::math::{almost_equal, angle_diff, normalize_angle_f64};
use crate::core::sampling::GaussianSampler;
use crate::core::types::{LaserScan, Pose2D, Twist2D};
use crate::error::{Result, SlamError};

use super::motion_model::{MotionModel, NoiseDiagonal, OdometryAlphas, OdometryModel};

/// Clamp bounds for one likelihood term.
///
/// Clamping keeps a single bad ray (or an overconfident one) from
/// zeroing out or dominating a particle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClampRange {
    pub min: f64,
    pub max: f64,
}

impl ClampRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Configuration for the particle filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbpfConfig {
    /// Number of particles. Typical: 20-50 with per-particle grids.
    pub num_particles: usize,

    /// Candidate poses drawn around the scan-matched mode per
    /// particle per step. Typical: 10
    pub samples_per_mode: usize,

    /// Odometry likelihood noise coefficients.
    pub alphas: OdometryAlphas,

    /// Process noise of the motion-model fallback, diagonal
    /// (theta, x, y) variances per tick.
    pub motion_noise: NoiseDiagonal,

    /// Spread of the candidate cloud around the matched mode,
    /// diagonal (theta, x, y) variances.
    pub sample_spread: NoiseDiagonal,

    /// Clamp bounds for the scan likelihood of a candidate.
    pub scan_likelihood: ClampRange,

    /// Clamp bounds for the odometry likelihood of a candidate.
    pub pose_likelihood: ClampRange,

    /// Random seed (0 for entropy).
    pub seed: u64,
}

impl Default for RbpfConfig {
    fn default() -> Self {
        Self {
            num_particles: 30,
            samples_per_mode: 10,
            alphas: OdometryAlphas::default(),
            motion_noise: NoiseDiagonal::new(4.0e-4, 2.5e-3, 2.5e-3),
            sample_spread: NoiseDiagonal::new(2.5e-3, 2.5e-3, 2.5e-3),
            scan_likelihood: ClampRange::new(1.0e-3, 100.0),
            pose_likelihood: ClampRange::new(1.0e-4, 10.0),
            seed: 0,
        }
    }
}

/// A single trajectory hypothesis with its own map.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Importance weight; normalized across the set after every step.
    pub weight: f64,
    /// Current pose estimate.
    pub pose: Pose2D,
    /// Pose before the most recent step.
    pub prev_pose: Pose2D,
    /// This particle's occupancy grid.
    pub grid: OccupancyGrid,
}

impl Particle {
    fn new(weight: f64, pose: Pose2D, grid: OccupancyGrid) -> Self {
        Self {
            weight,
            pose,
            // A fresh particle has no history; the first scan-match
            // failure must not read an unset previous pose.
            prev_pose: pose,
            grid,
        }
    }
}

/// Per-step diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RbpfState {
    /// Effective number of particles after the last normalization.
    pub neff: f64,
    /// Whether the last step resampled.
    pub resampled: bool,
    /// Whether the last step had a converged scan match.
    pub matched: bool,
    /// Total number of SLAM steps processed.
    pub steps: u64,
}

/// Rao-Blackwellized particle filter.
#[derive(Debug)]
pub struct Rbpf<M: ScanMatcher> {
    config: RbpfConfig,
    particles: Vec<Particle>,
    motion: MotionModel,
    odometry: OdometryModel,
    matcher: M,
    sampler: GaussianSampler,
    state: RbpfState,
    normalized_sq_sum: f64,
}

impl<M: ScanMatcher> Rbpf<M> {
    /// Create a filter with every particle at `initial_pose` holding a
    /// copy of `seed_grid`.
    pub fn new(config: RbpfConfig, matcher: M, initial_pose: Pose2D, seed_grid: OccupancyGrid) -> Self {
        let num_particles = config.num_particles.max(1);
        let weight = 1.0 / num_particles as f64;

        let particles = (0..num_particles)
            .map(|_| Particle::new(weight, initial_pose, seed_grid.clone()))
            .collect();

        let sampler = GaussianSampler::new(config.seed);
        let motion = MotionModel::new(config.motion_noise);
        let odometry = OdometryModel::new(config.alphas);

        Self {
            config,
            particles,
            motion,
            odometry,
            matcher,
            sampler,
            state: RbpfState::default(),
            normalized_sq_sum: 0.0,
        }
    }

    pub fn config(&self) -> &RbpfConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn state(&self) -> &RbpfState {
        &self.state
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Process one scan/odometry step.
    ///
    /// Errors abort the step: [`SlamError::ProposalCollapse`] when no
    /// candidate scores any likelihood, [`SlamError::WeightCollapse`]
    /// when the weight sum vanishes. Both indicate invalid input or
    /// catastrophic drift and must be surfaced by the caller.
    pub fn slam(
        &mut self,
        scan: &LaserScan,
        u: &Twist2D,
        cur_odom: &Pose2D,
        prev_odom: &Pose2D,
    ) -> Result<()> {
        self.state.steps += 1;
        self.state.resampled = false;

        // Odometry delta doubles as the matcher's initial guess.
        let t_init = odometry_delta(cur_odom, prev_odom);
        let icp = self.matcher.match_scan(scan, &t_init);
        self.state.matched = icp.converged;
        if !icp.converged {
            log::warn!("scan match failed; sampling from motion model only");
        }

        let cur_od = pose_to_vec(cur_odom);
        let prev_od = pose_to_vec(prev_odom);

        let Self {
            particles,
            motion,
            odometry,
            sampler,
            config,
            ..
        } = self;

        for particle in particles.iter_mut() {
            if !icp.converged {
                // Fallback: propagate through the motion model and
                // weight by the scan alone.
                particle.prev_pose = particle.pose;
                motion.sample(u, &mut particle.pose, sampler)?;

                let scan_likelihood =
                    particle.grid.likelihood_field_model(scan, &particle.pose);
                particle.weight *= scan_likelihood;
            } else {
                // Scan-matched Gaussian proposal around this
                // particle's ICP-refined pose.
                let mode = particle.pose.compose(&icp.transform);
                let candidates =
                    sample_mode(sampler, &mode, &config.sample_spread, config.samples_per_mode)?;

                let (mean, cov, eta) = gaussian_proposal(
                    &candidates,
                    particle,
                    scan,
                    odometry,
                    &cur_od,
                    &prev_od,
                    &config.scan_likelihood,
                    &config.pose_likelihood,
                )?;

                let new_pose = sampler.sample_multivariate(&mean, &cov)?;

                particle.prev_pose = particle.pose;
                particle.pose = vec_to_pose(&new_pose);
                particle.weight *= eta;
            }

            let pose = particle.pose;
            particle.grid.integrate_scan(scan, &pose);
        }

        self.normalize_weights()?;

        if self.effective_particles() < self.config.num_particles / 2 {
            log::info!(
                "resampling: neff {:.1} below {}",
                self.state.neff,
                self.config.num_particles / 2
            );
            self.low_variance_resample();
            self.state.resampled = true;
        }

        Ok(())
    }

    /// Normalize weights to sum to one and cache `Σ w²`.
    pub fn normalize_weights(&mut self) -> Result<()> {
        let sum: f64 = self.particles.iter().map(|p| p.weight).sum();
        if almost_equal(sum, 0.0) {
            return Err(SlamError::WeightCollapse);
        }

        self.normalized_sq_sum = 0.0;
        for particle in &mut self.particles {
            particle.weight /= sum;
            self.normalized_sq_sum += particle.weight * particle.weight;
        }
        self.state.neff = 1.0 / self.normalized_sq_sum;

        Ok(())
    }

    /// Effective sample size `⌊1 / Σ w²⌋`; meaningful only after
    /// [`normalize_weights`](Self::normalize_weights).
    pub fn effective_particles(&self) -> usize {
        if self.normalized_sq_sum <= 0.0 {
            return 0;
        }
        (1.0 / self.normalized_sq_sum) as usize
    }

    /// Systematic (low-variance) resampling.
    ///
    /// The partition width is `1/(N-1)`, kept as-is from the tuned
    /// system this derives from; a single-particle filter is
    /// degenerate and unsupported here.
    pub fn low_variance_resample(&mut self) {
        let n = self.particles.len();
        let r = self.sampler.standard_normal() / n as f64;

        let mut selected = Vec::with_capacity(n);
        let mut cumulative = self.particles[0].weight;
        let mut i = 0usize;

        for m in 0..n {
            let target = r + m as f64 / (n as f64 - 1.0);
            while target > cumulative {
                i += 1;
                if i > n - 1 {
                    i = n - 1;
                    break;
                }
                cumulative += self.particles[i].weight;
            }
            selected.push(i);
        }

        let new_particles: Vec<Particle> = selected
            .iter()
            .map(|&idx| self.particles[idx].clone())
            .collect();
        self.particles = new_particles;
    }

    fn best_index(&self) -> usize {
        let mut best = 0;
        let mut weight = 0.0;
        for (i, particle) in self.particles.iter().enumerate() {
            if particle.weight > weight {
                weight = particle.weight;
                best = i;
            }
        }
        best
    }

    /// Pose of the highest-weight particle.
    pub fn robot_pose(&self) -> Pose2D {
        self.particles[self.best_index()].pose
    }

    /// Map of the highest-weight particle.
    pub fn map(&self) -> &OccupancyGrid {
        &self.particles[self.best_index()].grid
    }

    /// Best map exported as row-major int8 occupancy
    /// (0 free, 100 occupied, -1 unknown).
    pub fn occupancy_cells(&self) -> Vec<i8> {
        self.map().to_occupancy_cells()
    }
}

/// World-frame odometry delta, heading wrapped.
fn odometry_delta(cur: &Pose2D, prev: &Pose2D) -> Pose2D {
    Pose2D::new(
        cur.x - prev.x,
        cur.y - prev.y,
        angle_diff(prev.theta, cur.theta),
    )
}

/// Pose as a (theta, x, y) vector, the layout of the proposal math.
#[inline]
fn pose_to_vec(pose: &Pose2D) -> Vector3<f64> {
    Vector3::new(pose.theta as f64, pose.x as f64, pose.y as f64)
}

#[inline]
fn vec_to_pose(v: &Vector3<f64>) -> Pose2D {
    Pose2D::new(v[1] as f32, v[2] as f32, v[0] as f32)
}

/// Draw K candidate poses from `N(mode, Σ_sample)`, headings wrapped.
fn sample_mode(
    sampler: &mut GaussianSampler,
    mode: &Pose2D,
    spread: &NoiseDiagonal,
    k: usize,
) -> Result<Vec<Vector3<f64>>> {
    let mean = pose_to_vec(mode);
    let cov = spread.as_covariance();

    (0..k)
        .map(|_| {
            let mut candidate = sampler.sample_multivariate(&mean, &cov)?;
            candidate[0] = normalize_angle_f64(candidate[0]);
            Ok(candidate)
        })
        .collect()
}

/// Fit the Gaussian proposal over the candidate cloud.
///
/// Candidates are weighted by clamped scan likelihood times clamped
/// odometry likelihood; returns the weighted mean, weighted
/// covariance, and the normalizer `η` (which also becomes the
/// particle's weight update).
#[allow(clippy::too_many_arguments)]
fn gaussian_proposal(
    candidates: &[Vector3<f64>],
    particle: &Particle,
    scan: &LaserScan,
    odometry: &OdometryModel,
    cur_odom: &Vector3<f64>,
    prev_odom: &Vector3<f64>,
    scan_clamp: &ClampRange,
    pose_clamp: &ClampRange,
) -> Result<(Vector3<f64>, Matrix3<f64>, f64)> {
    let prev_pose = pose_to_vec(&particle.prev_pose);

    let mut likelihoods = Vec::with_capacity(candidates.len());
    let mut mean = Vector3::zeros();
    let mut eta = 0.0;

    for candidate in candidates {
        let candidate_pose = vec_to_pose(candidate);

        let p_scan =
            scan_clamp.clamp(particle.grid.likelihood_field_model(scan, &candidate_pose));
        let p_pose =
            pose_clamp.clamp(odometry.likelihood(candidate, &prev_pose, cur_odom, prev_odom));

        let p = p_scan * p_pose;
        likelihoods.push(p);
        mean += candidate * p;
        eta += p;
    }

    if almost_equal(eta, 0.0) {
        return Err(SlamError::ProposalCollapse);
    }

    mean /= eta;
    mean[0] = normalize_angle_f64(mean[0]);

    let mut cov = Matrix3::zeros();
    for (candidate, p) in candidates.iter().zip(&likelihoods) {
        let d = candidate - mean;
        cov += d * d.transpose() * *p;
    }
    cov /= eta;

    Ok((mean, cov, eta))
}

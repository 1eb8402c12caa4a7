//! KestrelSLAM - Rao-Blackwellized particle filter SLAM for 2D
//! occupancy grids.
//!
//! The crate is organized into two layers:
//!
//! - [`core`]: foundation with no internal dependencies - math
//!   primitives, seedable Gaussian sampling, and the base types
//!   ([`Pose2D`], [`Twist2D`], [`LaserScan`]).
//! - [`algorithms`]: the estimation stack built on top of it -
//!   log-odds occupancy mapping, the scan-matcher seam, and the
//!   particle filter.
//!
//! Each particle of the filter carries its own map; a SLAM step
//! refines poses through a scan-matched Gaussian proposal (motion
//! model fallback when the match fails), weights and renormalizes the
//! set, integrates the scan into every particle's grid, and resamples
//! when the effective sample size collapses. The estimate exposed to
//! callers is always the highest-weight particle's pose and map.

pub mod core;

pub mod algorithms;

pub mod error;

// Convenience re-exports (flat namespace for common use)

pub use crate::core::math;
pub use crate::core::sampling::GaussianSampler;
pub use crate::core::types::{LaserScan, Point2D, Pose2D, Twist2D};

pub use algorithms::localization::{
    ClampRange, MotionModel, NoiseDiagonal, OdometryAlphas, OdometryModel, Particle, Rbpf,
    RbpfConfig, RbpfState,
};
pub use algorithms::mapping::{
    CellState, LikelihoodFieldConfig, OccupancyGrid, OccupancyGridConfig, RayTracer,
    ScanIntegrationConfig,
};
pub use algorithms::matching::{
    IdentityMatcher, RejectingMatcher, ScanMatchResult, ScanMatcher,
};

pub use error::{Result, SlamError};

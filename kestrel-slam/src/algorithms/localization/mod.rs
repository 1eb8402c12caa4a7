//! Localization: motion models and the Rao-Blackwellized particle
//! filter.

mod motion_model;
mod particle_filter;

pub use motion_model::{MotionModel, NoiseDiagonal, OdometryAlphas, OdometryModel};
pub use particle_filter::{ClampRange, Particle, Rbpf, RbpfConfig, RbpfState};

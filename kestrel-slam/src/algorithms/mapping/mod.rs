//! Occupancy-grid mapping.
//!
//! Log-odds occupancy grid with Bresenham scan integration and a
//! likelihood-field scoring model, plus the int8 export used by
//! downstream consumers.

mod occupancy_grid;
mod ray_tracer;

pub use occupancy_grid::{
    CellState, LikelihoodFieldConfig, OccupancyGrid, OccupancyGridConfig, ScanIntegrationConfig,
};
pub use ray_tracer::RayTracer;

//! Planner configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the incremental planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Half-width in cells of the square the simulated sensor reveals
    /// around the robot on every traversal step.
    pub visibility_radius: i32,

    /// Edge cost of moving into an occupied or inflated cell. Large
    /// enough that any free detour wins. Typical: 1000
    pub occupancy_cost: f64,

    /// Obstacle inflation radius in cells applied to the reference
    /// grid at construction. Inflated cells are traversed only at
    /// `occupancy_cost`.
    pub inflation_radius: i32,

    /// Expansion budget for one `plan_path` call. An unreachable goal
    /// otherwise expands forever.
    pub max_expansions: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            visibility_radius: 5,
            occupancy_cost: 1000.0,
            inflation_radius: 2,
            max_expansions: 100_000,
        }
    }
}

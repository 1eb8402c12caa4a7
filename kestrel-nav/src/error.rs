//! Error types for the planner.

use thiserror::Error;

/// Planner failures surfaced to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavError {
    /// The requested start position lies outside the grid.
    #[error("start position is outside the grid")]
    StartOutOfBounds,

    /// The requested goal position lies outside the grid.
    #[error("goal position is outside the grid")]
    GoalOutOfBounds,

    /// Planning exceeded the configured expansion budget, typically
    /// because no goal is reachable.
    #[error("planning exceeded {0} expansions")]
    ExpansionLimit(usize),

    /// Every neighbor of the robot's cell is blocked.
    #[error("no traversable neighbor to move into")]
    Blocked,
}

pub type Result<T> = std::result::Result<T, NavError>;

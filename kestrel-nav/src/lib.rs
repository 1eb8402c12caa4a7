//! KestrelNav - incremental path planning over kestrel occupancy maps.
//!
//! An incremental shortest-path replanner (D*-Lite variant) on an
//! 8-connected grid. The planner keeps a goal-rooted shortest-path
//! tree alive while edge costs change underneath it: traversal reveals
//! the true state of nearby cells, inconsistencies propagate through a
//! key-ordered open set, and only the affected region of the tree is
//! repaired.
//!
//! Typical loop:
//!
//! ```ignore
//! let mut planner = DStarLite::new(&map, PlannerConfig::default());
//! planner.init_path(start, goal)?;
//! planner.plan_path()?;
//! while !planner.goal_reached() {
//!     planner.path_traversal()?;
//! }
//! let trajectory = planner.get_path();
//! ```

pub mod config;
pub mod error;
pub mod planning;

pub use config::PlannerConfig;
pub use error::{NavError, Result};
pub use planning::{Cell, DStarLite, Key, Occupancy, COST_INFINITY};

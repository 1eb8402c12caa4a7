//! Incremental grid planning.

mod cell;
mod dstar_lite;

pub use cell::{Cell, Key, Occupancy, COST_INFINITY};
pub use dstar_lite::DStarLite;

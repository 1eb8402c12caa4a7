//! Core data types for SLAM operations.
//!
//! - [`Point2D`]: 2D point in meters
//! - [`Pose2D`]: robot pose / rigid transform (x, y, theta)
//! - [`Twist2D`]: planar velocity
//! - [`LaserScan`]: raw LiDAR scan in polar coordinates

mod pose;
mod scan;
mod twist;

pub use pose::{Point2D, Pose2D};
pub use scan::LaserScan;
pub use twist::Twist2D;

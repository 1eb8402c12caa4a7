//! Planar velocity type.

use serde::{Deserialize, Serialize};

/// Instantaneous planar velocity.
///
/// For a differential-drive base `vy` is structurally zero; it is
/// carried so the type round-trips full planar twists.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    /// Forward velocity in m/s
    pub vx: f32,
    /// Lateral velocity in m/s (unused by the motion model)
    pub vy: f32,
    /// Angular velocity in rad/s
    pub omega: f32,
}

impl Twist2D {
    #[inline]
    pub fn new(vx: f32, vy: f32, omega: f32) -> Self {
        Self { vx, vy, omega }
    }
}

//! Planner grid cells and their lexicographic keys.

use std::cmp::Ordering;

use kestrel_slam::Point2D;
use serde::{Deserialize, Serialize};

/// Cost sentinel standing in for +∞.
pub const COST_INFINITY: f64 = 1.0e12;

/// Occupancy label of a planner cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupancy {
    Free,
    Occupied,
    /// Near an obstacle; traversed only at the occupancy penalty.
    Inflated,
    Unknown,
}

impl Occupancy {
    /// Whether the robot may move into a cell in this state.
    #[inline]
    pub fn traversable(&self) -> bool {
        !matches!(self, Occupancy::Occupied | Occupancy::Inflated)
    }

    /// Conventional visualization value.
    #[inline]
    pub fn viz_value(&self) -> i8 {
        match self {
            Occupancy::Free => 0,
            Occupancy::Inflated => 30,
            Occupancy::Occupied => 100,
            Occupancy::Unknown => -1,
        }
    }
}

/// Two-valued lexicographic priority.
///
/// Keys are always derived from finite costs, so total ordering via
/// `total_cmp` is safe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key {
    pub k1: f64,
    pub k2: f64,
}

impl Eq for Key {}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.k1
            .total_cmp(&other.k1)
            .then_with(|| self.k2.total_cmp(&other.k2))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One cell of the planner's working grid.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Grid indices (i along x, j along y).
    pub i: i32,
    pub j: i32,
    /// Flat index, `i * ysize + j`.
    pub id: usize,
    /// World coordinates of the cell center.
    pub point: Point2D,
    pub state: Occupancy,
    /// Best known cost-to-goal.
    pub g: f64,
    /// One-step lookahead cost-to-goal.
    pub rhs: f64,
    /// Heuristic distance to the current start cell.
    pub h: f64,
    pub k1: f64,
    pub k2: f64,
    /// Next cell on the path to the goal.
    pub parent: Option<usize>,
    /// Whether the cell's true state has been revealed yet.
    pub observed: bool,
}

impl Cell {
    pub fn new(i: i32, j: i32, id: usize, point: Point2D) -> Self {
        Self {
            i,
            j,
            id,
            point,
            state: Occupancy::Free,
            g: COST_INFINITY,
            rhs: COST_INFINITY,
            h: 0.0,
            k1: COST_INFINITY,
            k2: COST_INFINITY,
            parent: None,
            observed: false,
        }
    }

    /// Recompute `(k1, k2)` from the current `g`, `rhs`, `h`.
    #[inline]
    pub fn calculate_keys(&mut self) {
        let m = self.g.min(self.rhs);
        self.k1 = m + self.h;
        self.k2 = m;
    }

    #[inline]
    pub fn key(&self) -> Key {
        Key {
            k1: self.k1,
            k2: self.k2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering_is_lexicographic() {
        let a = Key { k1: 1.0, k2: 5.0 };
        let b = Key { k1: 2.0, k2: 0.0 };
        let c = Key { k1: 1.0, k2: 6.0 };

        assert!(a < b);
        assert!(a < c);
        assert!(c < b);
    }

    #[test]
    fn test_calculate_keys_uses_min_of_g_rhs() {
        let mut cell = Cell::new(0, 0, 0, Point2D::new(0.0, 0.0));
        cell.g = 10.0;
        cell.rhs = 4.0;
        cell.h = 1.5;
        cell.calculate_keys();

        assert_eq!(cell.k1, 5.5);
        assert_eq!(cell.k2, 4.0);
    }

    #[test]
    fn test_traversability() {
        assert!(Occupancy::Free.traversable());
        assert!(Occupancy::Unknown.traversable());
        assert!(!Occupancy::Occupied.traversable());
        assert!(!Occupancy::Inflated.traversable());
    }

    #[test]
    fn test_viz_values() {
        assert_eq!(Occupancy::Free.viz_value(), 0);
        assert_eq!(Occupancy::Inflated.viz_value(), 30);
        assert_eq!(Occupancy::Occupied.viz_value(), 100);
        assert_eq!(Occupancy::Unknown.viz_value(), -1);
    }
}

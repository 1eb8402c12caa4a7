//! Occupancy grid map with log-odds probabilities.
//!
//! ```text
//! P(occupied) = 1 / (1 + exp(-log_odds))
//!
//! Update: log_odds_new = log_odds_old + log_odds_observation
//! ```
//!
//! The grid has fixed dimensions and a fixed world origin chosen at
//! construction. Particle filters clone one seed grid per particle,
//! and every clone must keep the seed's geometry, so there is no
//! automatic growth; rays leaving the grid are clipped.

use serde::{Deserialize, Serialize};

use super::RayTracer;
use crate::core::math::gaussian_pdf;
use crate::core::types::{LaserScan, Pose2D};

/// Cell classification by log-odds thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// Never observed
    Unknown,
    /// Definitely empty
    Free,
    /// Definitely contains an obstacle
    Occupied,
}

/// Parameters of scan integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanIntegrationConfig {
    /// Returns closer than this are ignored entirely (sensor noise).
    pub min_range: f32,

    /// Returns farther than this are traced as free space but the
    /// endpoint is not marked occupied.
    pub max_range: f32,

    /// Maximum ray length in cells handed to the tracer.
    pub max_ray_cells: usize,
}

impl Default for ScanIntegrationConfig {
    fn default() -> Self {
        Self {
            min_range: 0.15,
            max_range: 12.0,
            max_ray_cells: 1000,
        }
    }
}

/// Parameters of the likelihood-field scan scoring model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikelihoodFieldConfig {
    /// Weight of the Gaussian "hit" component. Typical: 0.9
    pub z_hit: f64,

    /// Weight of the uniform random-measurement component.
    /// Typical: 0.05
    pub z_random: f64,

    /// Standard deviation of the hit component in meters.
    /// Typical: 0.1-0.2
    pub sigma_hit: f64,

    /// Score every Nth beam. 1 = all beams.
    pub beam_skip: usize,

    /// Nearest-obstacle search radius in meters. Endpoints with no
    /// occupied cell inside this radius score at this distance.
    pub search_radius: f32,
}

impl Default for LikelihoodFieldConfig {
    fn default() -> Self {
        Self {
            z_hit: 0.9,
            z_random: 0.05,
            sigma_hit: 0.15,
            beam_skip: 3,
            search_radius: 2.0,
        }
    }
}

/// Configuration for the occupancy grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyGridConfig {
    /// Cell size in meters.
    pub resolution: f32,

    /// Map width in meters (fixed for the grid's lifetime).
    pub width: f32,

    /// Map height in meters.
    pub height: f32,

    /// Log-odds increment for an occupied observation. Typical: 0.9
    pub log_odds_occupied: f32,

    /// Log-odds increment for a free observation. Typical: -0.7
    pub log_odds_free: f32,

    /// Log-odds clamp bounds (prevent overconfidence).
    pub log_odds_max: f32,
    pub log_odds_min: f32,

    /// Cells at or above this log-odds are occupied.
    pub occupied_threshold: f32,

    /// Cells at or below this log-odds are free.
    pub free_threshold: f32,

    pub integration: ScanIntegrationConfig,
    pub likelihood: LikelihoodFieldConfig,
}

impl Default for OccupancyGridConfig {
    fn default() -> Self {
        Self {
            resolution: 0.05,
            width: 20.0,
            height: 20.0,
            log_odds_occupied: 0.9,
            log_odds_free: -0.7,
            log_odds_max: 50.0,
            log_odds_min: -50.0,
            occupied_threshold: 0.5,
            free_threshold: -0.5,
            integration: ScanIntegrationConfig::default(),
            likelihood: LikelihoodFieldConfig::default(),
        }
    }
}

/// 2D occupancy grid map.
///
/// Row-major log-odds storage: `index = cy * width + cx`. The grid is
/// centered on the world origin.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    config: OccupancyGridConfig,
    cells: Vec<f32>,
    width: usize,
    height: usize,
    origin_x: f32,
    origin_y: f32,
}

impl OccupancyGrid {
    pub fn new(config: OccupancyGridConfig) -> Self {
        let width = (config.width / config.resolution).ceil() as usize;
        let height = (config.height / config.resolution).ceil() as usize;

        // Center the grid around the world origin
        let origin_x = -config.width / 2.0;
        let origin_y = -config.height / 2.0;

        Self {
            config,
            cells: vec![0.0; width * height], // 0.0 = unknown
            width,
            height,
            origin_x,
            origin_y,
        }
    }

    pub fn config(&self) -> &OccupancyGridConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn resolution(&self) -> f32 {
        self.config.resolution
    }

    /// World coordinates of cell (0, 0).
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    /// Convert world coordinates to cell indices.
    ///
    /// Returns `None` outside grid bounds.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let cx = ((x - self.origin_x) / self.config.resolution).floor();
        let cy = ((y - self.origin_y) / self.config.resolution).floor();

        if cx >= 0.0 && cy >= 0.0 {
            let cx = cx as usize;
            let cy = cy as usize;
            if cx < self.width && cy < self.height {
                return Some((cx, cy));
            }
        }
        None
    }

    /// Convert world coordinates to signed cell indices (may be
    /// outside bounds; used by ray traversal).
    #[inline]
    pub fn world_to_cell_signed(&self, x: f32, y: f32) -> (i32, i32) {
        let cx = ((x - self.origin_x) / self.config.resolution).floor() as i32;
        let cy = ((y - self.origin_y) / self.config.resolution).floor() as i32;
        (cx, cy)
    }

    /// World coordinates of a cell center.
    #[inline]
    pub fn cell_to_world(&self, cx: usize, cy: usize) -> (f32, f32) {
        let x = self.origin_x + (cx as f32 + 0.5) * self.config.resolution;
        let y = self.origin_y + (cy as f32 + 0.5) * self.config.resolution;
        (x, y)
    }

    #[inline]
    pub fn is_valid_cell(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.width && (cy as usize) < self.height
    }

    #[inline]
    fn cell_index(&self, cx: usize, cy: usize) -> usize {
        cy * self.width + cx
    }

    /// Log-odds at a cell; 0.0 (unknown) out of bounds.
    #[inline]
    pub fn get_log_odds(&self, cx: usize, cy: usize) -> f32 {
        if cx < self.width && cy < self.height {
            self.cells[self.cell_index(cx, cy)]
        } else {
            0.0
        }
    }

    /// Cell classification by the configured thresholds.
    pub fn get_state(&self, cx: usize, cy: usize) -> CellState {
        let log_odds = self.get_log_odds(cx, cy);

        if log_odds >= self.config.occupied_threshold {
            CellState::Occupied
        } else if log_odds <= self.config.free_threshold {
            CellState::Free
        } else {
            CellState::Unknown
        }
    }

    /// Occupancy probability in [0, 1].
    pub fn get_probability(&self, cx: usize, cy: usize) -> f32 {
        let log_odds = self.get_log_odds(cx, cy);
        1.0 / (1.0 + (-log_odds).exp())
    }

    /// Apply one clamped log-odds observation to a cell.
    #[inline]
    pub fn update_cell(&mut self, cx: usize, cy: usize, occupied: bool) {
        if cx >= self.width || cy >= self.height {
            return;
        }

        let idx = self.cell_index(cx, cy);
        let delta = if occupied {
            self.config.log_odds_occupied
        } else {
            self.config.log_odds_free
        };

        self.cells[idx] =
            (self.cells[idx] + delta).clamp(self.config.log_odds_min, self.config.log_odds_max);
    }

    /// Apply an observation at signed indices; out of bounds is a no-op.
    #[inline]
    pub fn update_cell_signed(&mut self, cx: i32, cy: i32, occupied: bool) {
        if self.is_valid_cell(cx, cy) {
            self.update_cell(cx as usize, cy as usize, occupied);
        }
    }

    /// Integrate a laser scan taken at `pose` into the grid.
    ///
    /// Per beam: trace free space from the pose to the return, mark
    /// the endpoint occupied when the return is inside the valid
    /// occupancy band. Returns beyond `max_range` still carve free
    /// space up to `max_range`.
    pub fn integrate_scan(&mut self, scan: &LaserScan, pose: &Pose2D) {
        let integration = self.config.integration.clone();
        let tracer = RayTracer::new(integration.max_ray_cells);

        for i in 0..scan.len() {
            let range = scan.ranges[i];
            if !range.is_finite() || range < scan.range_min || range < integration.min_range {
                continue;
            }

            let ceiling = integration.max_range.min(scan.range_max);
            let mark_endpoint = range <= ceiling;
            let traced = range.min(ceiling);

            let angle = pose.theta + scan.beam_angle(i);
            let (sin_a, cos_a) = angle.sin_cos();
            let end_x = pose.x + traced * cos_a;
            let end_y = pose.y + traced * sin_a;

            tracer.trace_ray(self, pose.x, pose.y, end_x, end_y, mark_endpoint);
        }
    }

    /// Likelihood-field score of a scan at a candidate pose.
    ///
    /// Sums, over (subsampled) valid beams, the mixture
    /// `z_hit · N(d; 0, σ_hit²) + z_random / max_range` where `d` is
    /// the distance from the beam endpoint to the nearest occupied
    /// cell. A scan with no usable beams scores a neutral 1.0.
    pub fn likelihood_field_model(&self, scan: &LaserScan, pose: &Pose2D) -> f64 {
        let lf = &self.config.likelihood;
        let skip = lf.beam_skip.max(1);
        let var_hit = lf.sigma_hit * lf.sigma_hit;
        let p_random = lf.z_random / self.config.integration.max_range as f64;

        let mut score = 0.0;
        let mut beams = 0usize;

        for i in (0..scan.len()).step_by(skip) {
            if !scan.is_valid(i) {
                continue;
            }

            let angle = pose.theta + scan.beam_angle(i);
            let (sin_a, cos_a) = angle.sin_cos();
            let end_x = pose.x + scan.ranges[i] * cos_a;
            let end_y = pose.y + scan.ranges[i] * sin_a;

            let d = self.nearest_occupied_distance(end_x, end_y);
            score += lf.z_hit * gaussian_pdf(d, var_hit) + p_random;
            beams += 1;
        }

        if beams == 0 {
            return 1.0;
        }
        score
    }

    /// Distance in meters from a world point to the nearest occupied
    /// cell, searched in growing rings and capped at `search_radius`.
    fn nearest_occupied_distance(&self, x: f32, y: f32) -> f64 {
        let lf = &self.config.likelihood;
        let cap = lf.search_radius as f64;

        let Some((cx, cy)) = self.world_to_cell(x, y) else {
            return cap;
        };
        let (cx, cy) = (cx as i32, cy as i32);
        let max_ring = (lf.search_radius / self.config.resolution).ceil() as i32;

        let mut best_cells = f64::INFINITY;
        for ring in 0..=max_ring {
            // A later ring cannot contain anything closer than its own
            // Chebyshev radius.
            if ring as f64 > best_cells {
                break;
            }
            for (nx, ny) in ring_cells(cx, cy, ring) {
                if !self.is_valid_cell(nx, ny) {
                    continue;
                }
                if self.get_state(nx as usize, ny as usize) == CellState::Occupied {
                    let di = (nx - cx) as f64;
                    let dj = (ny - cy) as f64;
                    best_cells = best_cells.min((di * di + dj * dj).sqrt());
                }
            }
        }

        if best_cells.is_finite() {
            (best_cells * self.config.resolution as f64).min(cap)
        } else {
            cap
        }
    }

    /// Export as row-major int8 occupancy: 0 free, 100 occupied,
    /// -1 unknown.
    pub fn to_occupancy_cells(&self) -> Vec<i8> {
        let mut out = Vec::with_capacity(self.width * self.height);

        for cy in 0..self.height {
            for cx in 0..self.width {
                out.push(match self.get_state(cx, cy) {
                    CellState::Free => 0,
                    CellState::Occupied => 100,
                    CellState::Unknown => -1,
                });
            }
        }

        out
    }
}

/// Cells at Chebyshev distance `ring` from the center (the center
/// itself for ring 0).
fn ring_cells(cx: i32, cy: i32, ring: i32) -> Vec<(i32, i32)> {
    if ring == 0 {
        return vec![(cx, cy)];
    }

    let mut cells = Vec::with_capacity((8 * ring) as usize);
    for dx in -ring..=ring {
        cells.push((cx + dx, cy - ring));
        cells.push((cx + dx, cy + ring));
    }
    for dy in (-ring + 1)..ring {
        cells.push((cx - ring, cy + dy));
        cells.push((cx + ring, cy + dy));
    }
    cells
}

//! Incremental shortest-path replanner (D*-Lite variant).
//!
//! Maintains a shortest-path tree rooted at the goal over a grid whose
//! edge costs change as cells are revealed. Planning expands a
//! key-ordered open set until the start cell is consistent; traversal
//! moves the robot one cell at a time, reveals the true state of cells
//! within a visibility box, and repairs the tree by propagating the
//! resulting inconsistencies.
//!
//! The heuristic is anchored to the robot's current cell and
//! recomputed for the whole open set whenever the robot moves; there
//! is no key offset bookkeeping.

use kestrel_slam::math::almost_equal;
use kestrel_slam::{CellState, OccupancyGrid, Point2D};

use super::cell::{Cell, Occupancy, COST_INFINITY};
use crate::config::PlannerConfig;
use crate::error::{NavError, Result};

/// 8-connected neighborhood offsets.
const ACTIONS: [(i32, i32); 8] = [
    (0, -1),
    (0, 1),
    (-1, 0),
    (1, 0),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Incremental grid planner.
///
/// Owns a working grid (what the robot believes) and a reference grid
/// (ground truth revealed by the simulated sensor during traversal).
/// The open set holds value copies of cells, kept consistent with the
/// working grid by removal/reinsertion in `update_cell` and a
/// resort-and-recompute pass before every expansion decision.
#[derive(Debug)]
pub struct DStarLite {
    config: PlannerConfig,
    xsize: i32,
    ysize: i32,
    resolution: f32,
    origin_x: f32,
    origin_y: f32,

    /// Working grid, flat-indexed `i * ysize + j`.
    cells: Vec<Cell>,
    /// True cell states, revealed into the working grid on traversal.
    reference: Vec<Occupancy>,
    /// Open set, sorted ascending by key before use.
    open: Vec<Cell>,

    start_id: usize,
    goal_id: usize,
    /// World points of cells traversed so far.
    traversed: Vec<Point2D>,
    /// Cells touched by the most recent `plan_path`.
    visited: Vec<usize>,
    goal_reached: bool,
}

impl DStarLite {
    /// Build a planner over the geometry and contents of `map`.
    ///
    /// The map's cell states become the reference grid, with obstacle
    /// inflation applied around occupied cells. The working grid
    /// starts all-free and unobserved.
    pub fn new(map: &OccupancyGrid, config: PlannerConfig) -> Self {
        let (width, height) = map.dimensions();
        let xsize = width as i32;
        let ysize = height as i32;

        let mut cells = Vec::with_capacity(width * height);
        let mut reference = Vec::with_capacity(width * height);

        for i in 0..xsize {
            for j in 0..ysize {
                let id = (i * ysize + j) as usize;
                let (wx, wy) = map.cell_to_world(i as usize, j as usize);
                cells.push(Cell::new(i, j, id, Point2D::new(wx, wy)));

                reference.push(match map.get_state(i as usize, j as usize) {
                    CellState::Free => Occupancy::Free,
                    CellState::Occupied => Occupancy::Occupied,
                    CellState::Unknown => Occupancy::Unknown,
                });
            }
        }

        inflate(&mut reference, xsize, ysize, config.inflation_radius);

        let (origin_x, origin_y) = map.origin();

        Self {
            config,
            xsize,
            ysize,
            resolution: map.resolution(),
            origin_x,
            origin_y,
            cells,
            reference,
            open: Vec::new(),
            start_id: 0,
            goal_id: 0,
            traversed: Vec::new(),
            visited: Vec::new(),
            goal_reached: false,
        }
    }

    /// Record start and goal and seed the open set with the goal.
    pub fn init_path(&mut self, start: Point2D, goal: Point2D) -> Result<()> {
        self.start_id = self
            .world_to_id(&start)
            .ok_or(NavError::StartOutOfBounds)?;
        self.goal_id = self.world_to_id(&goal).ok_or(NavError::GoalOutOfBounds)?;

        let h = self.heuristic(self.goal_id);
        let goal_cell = &mut self.cells[self.goal_id];
        goal_cell.rhs = 0.0;
        goal_cell.h = h;
        goal_cell.calculate_keys();

        self.open.push(self.cells[self.goal_id].clone());
        Ok(())
    }

    /// Expand the open set until the start cell is consistent and
    /// holds the minimum key.
    pub fn plan_path(&mut self) -> Result<()> {
        self.visited.clear();
        let mut expansions = 0usize;

        while self.if_planning() {
            expansions += 1;
            if expansions > self.config.max_expansions {
                return Err(NavError::ExpansionLimit(self.config.max_expansions));
            }

            // Open set was sorted by if_planning
            let min_cell = self.open.remove(0);
            let id = min_cell.id;

            if min_cell.g > min_cell.rhs {
                // Overconsistent: commit the lookahead cost and relax
                // the predecessors.
                self.cells[id].g = self.cells[id].rhs;

                for nid in self.neighbors(id) {
                    self.update_cell(nid);
                    self.visited.push(nid);
                }
            } else {
                // Underconsistent: invalidate and reprocess the cell
                // along with its predecessors.
                self.cells[id].g = COST_INFINITY;

                for nid in self.neighbors(id) {
                    self.update_cell(nid);
                    self.visited.push(nid);
                }
                self.update_cell(id);
                self.visited.push(id);
            }
        }

        Ok(())
    }

    /// Move the robot one cell toward the goal and repair the tree
    /// with whatever the move revealed.
    pub fn path_traversal(&mut self) -> Result<()> {
        if self.start_id == self.goal_id {
            if !self.goal_reached {
                log::info!("goal reached");
                self.goal_reached = true;
            }
            return Ok(());
        }

        // Move to the cheapest traversable neighbor.
        let (next, _) = self
            .min_neighbor(self.start_id, true)
            .ok_or(NavError::Blocked)?;
        self.start_id = next;
        self.traversed.push(self.cells[next].point);

        let revealed = self.simulate_grid_update();
        if revealed.is_empty() {
            return Ok(());
        }

        // Every revealed cell is a potential edge-cost change; its
        // neighbors' lookahead costs must be recomputed.
        for &cid in &revealed {
            for nid in self.neighbors(cid) {
                self.update_cell(nid);
            }
        }

        // The heuristic is anchored to the start cell, which moved.
        for idx in 0..self.open.len() {
            let id = self.open[idx].id;
            let h = self.heuristic(id);
            let entry = &mut self.open[idx];
            entry.h = h;
            entry.calculate_keys();
        }

        self.plan_path()
    }

    /// Traversed prefix plus the parent chain from the current start.
    pub fn get_path(&self) -> Vec<Point2D> {
        let mut traj = self.traversed.clone();

        let mut id = Some(self.start_id);
        let mut hops = 0usize;
        while let Some(cur) = id {
            traj.push(self.cells[cur].point);
            id = self.cells[cur].parent;

            hops += 1;
            if hops > self.cells.len() {
                break;
            }
        }

        traj
    }

    /// World points of the cells touched by the last planning pass.
    pub fn visited_cells(&self) -> Vec<Point2D> {
        self.visited
            .iter()
            .map(|&id| self.cells[id].point)
            .collect()
    }

    /// Working grid for visualization: 0 free, 30 inflated,
    /// 100 occupied, -1 unknown, transposed from the internal
    /// x-major layout into row-major via `idx = col * xsize + row`.
    pub fn grid_viz(&self) -> Vec<i8> {
        let mut map = vec![0i8; self.cells.len()];

        for id in 0..self.cells.len() {
            let row = id / self.ysize as usize;
            let col = id % self.ysize as usize;
            let idx = col * self.xsize as usize + row;
            map[idx] = self.cells[id].state.viz_value();
        }

        map
    }

    /// World points the robot has stepped through.
    pub fn traversed(&self) -> &[Point2D] {
        &self.traversed
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    pub fn start_id(&self) -> usize {
        self.start_id
    }

    pub fn goal_id(&self) -> usize {
        self.goal_id
    }

    /// Read access to a working-grid cell.
    pub fn cell(&self, id: usize) -> &Cell {
        &self.cells[id]
    }

    /// Open-set snapshot (ids only).
    pub fn open_ids(&self) -> Vec<usize> {
        self.open.iter().map(|c| c.id).collect()
    }

    /// Flat cell id of a world point, if inside the grid.
    pub fn world_to_id(&self, point: &Point2D) -> Option<usize> {
        let i = ((point.x - self.origin_x) / self.resolution).floor() as i32;
        let j = ((point.y - self.origin_y) / self.resolution).floor() as i32;

        if i >= 0 && j >= 0 && i < self.xsize && j < self.ysize {
            Some((i * self.ysize + j) as usize)
        } else {
            None
        }
    }

    /// Recompute the lookahead cost of a cell and requeue it if it is
    /// locally inconsistent.
    fn update_cell(&mut self, id: usize) {
        if id != self.goal_id {
            if let Some((min_id, cost)) = self.min_neighbor(id, false) {
                self.cells[id].rhs = cost;
                self.cells[id].parent = Some(min_id);
            }
        }

        if let Some(pos) = self.open.iter().position(|c| c.id == id) {
            self.open.remove(pos);
        }

        if self.cells[id].rhs != self.cells[id].g {
            let h = self.heuristic(id);
            let cell = &mut self.cells[id];
            cell.h = h;
            cell.calculate_keys();
            self.open.push(cell.clone());
        }
    }

    /// Whether expansion must continue: the top key is still below the
    /// start's, or the start is locally inconsistent.
    fn if_planning(&mut self) -> bool {
        let h = self.heuristic(self.start_id);
        let start_cell = &mut self.cells[self.start_id];
        start_cell.h = h;
        start_cell.calculate_keys();

        if self.open.is_empty() {
            return false;
        }
        self.open.sort_by(|a, b| a.key().cmp(&b.key()));

        let min_key1 = self.open[0].k1;
        let min_key2 = self.open[0].k2;
        let start = &self.cells[self.start_id];

        if almost_equal(min_key1, start.k1) {
            if min_key2 < start.k2 || start.rhs != start.g {
                return true;
            }
        } else if min_key1 < start.k1 || start.rhs != start.g {
            return true;
        }

        false
    }

    /// Reveal the true state of unobserved cells within the visibility
    /// box around the robot. Returns the ids of the revealed cells.
    fn simulate_grid_update(&mut self) -> Vec<usize> {
        let iu = self.cells[self.start_id].i;
        let ju = self.cells[self.start_id].j;
        let r = self.config.visibility_radius;

        let i_min = (iu - r).max(0);
        let i_max = (iu + r).min(self.xsize - 1);
        let j_min = (ju - r).max(0);
        let j_max = (ju + r).min(self.ysize - 1);

        let mut revealed = Vec::new();
        for i in i_min..=i_max {
            for j in j_min..=j_max {
                let id = (i * self.ysize + j) as usize;
                if !self.cells[id].observed {
                    self.cells[id].observed = true;
                    self.cells[id].state = self.reference[id];
                    revealed.push(id);
                }
            }
        }

        revealed
    }

    /// In-bounds 8-connected neighbors of a cell.
    fn neighbors(&self, id: usize) -> Vec<usize> {
        let cell = &self.cells[id];
        let mut out = Vec::with_capacity(8);

        for (di, dj) in ACTIONS {
            let ni = cell.i + di;
            let nj = cell.j + dj;
            if ni >= 0 && nj >= 0 && ni < self.xsize && nj < self.ysize {
                out.push((ni * self.ysize + nj) as usize);
            }
        }

        out
    }

    /// Neighbor minimizing `g + c(id, neighbor)`.
    ///
    /// With `traversable_only`, occupied and inflated cells are not
    /// candidates (used when actually moving the robot); without it,
    /// every neighbor competes (used for lookahead costs).
    fn min_neighbor(&self, id: usize, traversable_only: bool) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;

        for nid in self.neighbors(id) {
            if traversable_only && !self.cells[nid].state.traversable() {
                continue;
            }

            let cost = self.cells[nid].g + self.edge_cost(id, nid);
            match best {
                Some((_, best_cost)) if best_cost <= cost => {}
                _ => best = Some((nid, cost)),
            }
        }

        best
    }

    /// Cost of the directed edge `from → to`: the occupancy penalty
    /// into blocked cells, Euclidean index distance otherwise.
    fn edge_cost(&self, from: usize, to: usize) -> f64 {
        let b = &self.cells[to];
        if !b.state.traversable() {
            return self.config.occupancy_cost;
        }

        let a = &self.cells[from];
        let di = (a.i - b.i) as f64;
        let dj = (a.j - b.j) as f64;
        (di * di + dj * dj).sqrt()
    }

    /// Euclidean index distance from a cell to the current start.
    fn heuristic(&self, id: usize) -> f64 {
        let start = &self.cells[self.start_id];
        let cell = &self.cells[id];

        let di = (cell.i - start.i) as f64;
        let dj = (cell.j - start.j) as f64;
        (di * di + dj * dj).sqrt()
    }
}

/// Mark free/unknown cells within `radius` of an occupied cell as
/// inflated.
fn inflate(states: &mut [Occupancy], xsize: i32, ysize: i32, radius: i32) {
    if radius <= 0 {
        return;
    }

    let occupied: Vec<(i32, i32)> = (0..xsize)
        .flat_map(|i| (0..ysize).map(move |j| (i, j)))
        .filter(|&(i, j)| states[(i * ysize + j) as usize] == Occupancy::Occupied)
        .collect();

    for (i, j) in occupied {
        for di in -radius..=radius {
            for dj in -radius..=radius {
                if di * di + dj * dj > radius * radius {
                    continue;
                }
                let ni = i + di;
                let nj = j + dj;
                if ni < 0 || nj < 0 || ni >= xsize || nj >= ysize {
                    continue;
                }
                let idx = (ni * ysize + nj) as usize;
                if states[idx] != Occupancy::Occupied {
                    states[idx] = Occupancy::Inflated;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kestrel_slam::OccupancyGridConfig;

    /// 10x10 one-meter grid centered on the origin; cell centers at
    /// -4.5..=4.5.
    fn ten_by_ten() -> OccupancyGrid {
        OccupancyGrid::new(OccupancyGridConfig {
            resolution: 1.0,
            width: 10.0,
            height: 10.0,
            ..Default::default()
        })
    }

    fn test_config() -> PlannerConfig {
        PlannerConfig {
            visibility_radius: 2,
            inflation_radius: 0,
            ..Default::default()
        }
    }

    fn corner_to_corner(planner: &mut DStarLite) {
        planner
            .init_path(Point2D::new(-4.5, -4.5), Point2D::new(4.5, 4.5))
            .unwrap();
    }

    #[test]
    fn test_trivial_diagonal_plan() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());
        corner_to_corner(&mut planner);
        planner.plan_path().unwrap();

        let start = planner.cell(planner.start_id());
        let expected = 9.0 * std::f64::consts::SQRT_2;
        assert_relative_eq!(start.g, expected, epsilon = 1e-9);
        assert_relative_eq!(start.rhs, expected, epsilon = 1e-9);

        // Parent chain walks the diagonal: 10 cells including both ends
        let path = planner.get_path();
        assert_eq!(path.len(), 10);
        for pair in path.windows(2) {
            assert_relative_eq!(pair[1].x - pair[0].x, 1.0, epsilon = 1e-6);
            assert_relative_eq!(pair[1].y - pair[0].y, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_plan_is_idempotent_without_changes() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());
        corner_to_corner(&mut planner);
        planner.plan_path().unwrap();

        let snapshot: Vec<(f64, f64)> = (0..100)
            .map(|id| (planner.cell(id).g, planner.cell(id).rhs))
            .collect();

        planner.plan_path().unwrap();

        for (id, (g, rhs)) in snapshot.into_iter().enumerate() {
            assert_eq!(planner.cell(id).g, g, "g changed at {}", id);
            assert_eq!(planner.cell(id).rhs, rhs, "rhs changed at {}", id);
        }
    }

    #[test]
    fn test_open_set_holds_only_inconsistent_cells() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());
        corner_to_corner(&mut planner);
        planner.plan_path().unwrap();

        for id in planner.open_ids() {
            let cell = planner.cell(id);
            assert_ne!(cell.g, cell.rhs, "consistent cell {} on open set", id);
        }
    }

    #[test]
    fn test_start_key_not_below_open_minimum_after_plan() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());
        corner_to_corner(&mut planner);
        planner.plan_path().unwrap();

        let start = planner.cell(planner.start_id());
        assert_eq!(start.g, start.rhs);
        // Everything still queued expands no earlier than the start
        for id in planner.open_ids() {
            let cell = planner.cell(id);
            assert!(
                cell.k1 >= start.k1 - 1e-9,
                "open cell {} has key {} below start key {}",
                id,
                cell.k1,
                start.k1
            );
        }
    }

    #[test]
    fn test_neighbors_clipped_at_grid_edges() {
        let planner = DStarLite::new(&ten_by_ten(), test_config());

        // Corner cell (0, 0)
        assert_eq!(planner.neighbors(0).len(), 3);
        // Edge cell (0, 5)
        assert_eq!(planner.neighbors(5).len(), 5);
        // Interior cell
        let interior = (5 * 10 + 5) as usize;
        assert_eq!(planner.neighbors(interior).len(), 8);
    }

    #[test]
    fn test_edge_cost_penalizes_blocked_cells() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());
        let target = 5 * 10 + 5;
        planner.cells[target].state = Occupancy::Occupied;

        let from = 4 * 10 + 4;
        assert_eq!(planner.edge_cost(from, target), 1000.0);

        planner.cells[target].state = Occupancy::Inflated;
        assert_eq!(planner.edge_cost(from, target), 1000.0);

        planner.cells[target].state = Occupancy::Free;
        assert_relative_eq!(
            planner.edge_cost(from, target),
            std::f64::consts::SQRT_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_expansion_limit_is_enforced() {
        let config = PlannerConfig {
            max_expansions: 3,
            ..test_config()
        };
        let mut planner = DStarLite::new(&ten_by_ten(), config);
        corner_to_corner(&mut planner);

        assert_eq!(planner.plan_path(), Err(NavError::ExpansionLimit(3)));
    }

    #[test]
    fn test_init_rejects_out_of_bounds() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());

        assert_eq!(
            planner.init_path(Point2D::new(-50.0, 0.0), Point2D::new(4.5, 4.5)),
            Err(NavError::StartOutOfBounds)
        );
        assert_eq!(
            planner.init_path(Point2D::new(-4.5, -4.5), Point2D::new(50.0, 0.0)),
            Err(NavError::GoalOutOfBounds)
        );
    }

    #[test]
    fn test_grid_viz_transposes_layout() {
        // 2 cells along x, 3 along y
        let grid = OccupancyGrid::new(OccupancyGridConfig {
            resolution: 1.0,
            width: 2.0,
            height: 3.0,
            ..Default::default()
        });
        let mut planner = DStarLite::new(&grid, test_config());

        // Internal id of (i=1, j=2) is 1*3 + 2 = 5; transposed index
        // is col*xsize + row = 2*2 + 1 = 5
        planner.cells[5].state = Occupancy::Occupied;
        // Internal id of (i=1, j=0) is 3; transposed index is 0*2+1 = 1
        planner.cells[3].state = Occupancy::Inflated;

        let viz = planner.grid_viz();
        assert_eq!(viz.len(), 6);
        assert_eq!(viz[5], 100);
        assert_eq!(viz[1], 30);
    }

    #[test]
    fn test_inflation_marks_ring_around_obstacles() {
        let mut grid = ten_by_ten();
        let (cx, cy) = grid.world_to_cell(0.5, 0.5).unwrap();
        for _ in 0..10 {
            grid.update_cell(cx, cy, true);
        }

        let config = PlannerConfig {
            inflation_radius: 1,
            ..Default::default()
        };
        let planner = DStarLite::new(&grid, config);

        let center = (cx as i32 * 10 + cy as i32) as usize;
        assert_eq!(planner.reference[center], Occupancy::Occupied);
        let beside = ((cx as i32 + 1) * 10 + cy as i32) as usize;
        assert_eq!(planner.reference[beside], Occupancy::Inflated);
        let far = ((cx as i32 + 3) * 10 + cy as i32) as usize;
        assert_ne!(planner.reference[far], Occupancy::Inflated);
    }

    #[test]
    fn test_traversal_reaches_goal_on_open_grid() {
        let mut planner = DStarLite::new(&ten_by_ten(), test_config());
        corner_to_corner(&mut planner);
        planner.plan_path().unwrap();

        for _ in 0..30 {
            planner.path_traversal().unwrap();
            if planner.goal_reached() {
                break;
            }
        }

        assert!(planner.goal_reached());
        // Nine diagonal moves from corner to corner
        assert_eq!(planner.traversed().len(), 9);
    }
}

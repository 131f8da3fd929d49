//! Routing trait and default A* implementation.
//!
//! # Pluggability
//!
//! The scheduler and executor call routing through the [`Router`] trait, so
//! a different planner (or the [`CachingRouter`][crate::CachingRouter]
//! wrapper) can be swapped in at compile time with no runtime cost.
//!
//! # Cost units
//!
//! Every move between adjacent cells costs 1, diagonal or not.  A route's
//! cost is therefore its number of moves, `cells.len() - 1`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::debug;

use tms_core::Position;

use crate::grid::Grid;
use crate::{SpatialError, SpatialResult};

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: every cell from start to goal, inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub cells: Vec<Position>,
}

impl Route {
    /// First cell.  A `Route` always holds at least one cell.
    pub fn start(&self) -> Position {
        self.cells[0]
    }

    /// Last cell.
    pub fn goal(&self) -> Position {
        self.cells[self.cells.len() - 1]
    }

    /// Number of cells, endpoints included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Number of moves (edges) along the route.
    pub fn moves(&self) -> u32 {
        (self.cells.len() - 1) as u32
    }

    /// `true` if the start and goal are the same cell.
    pub fn is_trivial(&self) -> bool {
        self.cells.len() == 1
    }

    /// Travel time in ticks at `ticks_per_move`.
    pub fn travel_ticks(&self, ticks_per_move: u32) -> u64 {
        self.moves() as u64 * ticks_per_move as u64
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable path planner.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: the scheduler may evaluate
/// candidate routes on Rayon worker threads (feature `parallel` of
/// `tms-schedule`).
pub trait Router: Send + Sync {
    /// Shortest route from `start` to `goal` given the grid's current
    /// obstacles.
    ///
    /// # Errors
    ///
    /// - `InvalidPosition` if either endpoint is out of bounds or blocked.
    /// - `NoPathFound` if the goal is unreachable.
    fn route(&self, grid: &Grid, start: Position, goal: Position) -> SpatialResult<Route>;
}

impl<R: Router + ?Sized> Router for &R {
    fn route(&self, grid: &Grid, start: Position, goal: Position) -> SpatialResult<Route> {
        (**self).route(grid, start, goal)
    }
}

// ── AStarRouter ───────────────────────────────────────────────────────────────

/// A* search over the grid graph with unit edge costs.
///
/// The heuristic is the grid's own (Manhattan for 4-connectivity, Chebyshev
/// for 8), which is consistent for unit costs, so the first time the goal is
/// popped its cost is optimal and closed cells never need reopening.
///
/// Frontier entries are ordered by `(f, position)`: among equal `f` the
/// lexicographically smallest cell is expanded first.  Together with the
/// grid's fixed neighbour order this makes repeated queries on an unchanged
/// grid return identical routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarRouter;

impl Router for AStarRouter {
    fn route(&self, grid: &Grid, start: Position, goal: Position) -> SpatialResult<Route> {
        astar(grid, start, goal)
    }
}

// ── A* internals ──────────────────────────────────────────────────────────────

const NO_PREV: usize = usize::MAX;

/// Resolve a route endpoint to its cell index, rejecting out-of-bounds and
/// blocked cells as `InvalidPosition`.
fn endpoint(grid: &Grid, position: Position) -> SpatialResult<usize> {
    let i = grid
        .index(position)
        .map_err(|_| SpatialError::InvalidPosition { position, reason: "out of bounds" })?;
    if grid.is_blocked_at(i) {
        return Err(SpatialError::InvalidPosition { position, reason: "cell is blocked" });
    }
    Ok(i)
}

fn astar(grid: &Grid, start: Position, goal: Position) -> SpatialResult<Route> {
    let s = endpoint(grid, start)?;
    let g = endpoint(grid, goal)?;
    if s == g {
        return Ok(Route { cells: vec![start] });
    }

    let n = grid.cell_count();
    // g_score[v] = best known move count from start to v.
    let mut g_score = vec![u32::MAX; n];
    // prev[v] = cell index that reached v; NO_PREV for unreached cells.
    let mut prev    = vec![NO_PREV; n];
    let mut closed  = vec![false; n];

    g_score[s] = 0;

    // Min-heap on (f, position); Reverse turns BinaryHeap (max) into a min-heap.
    let mut heap: BinaryHeap<Reverse<(u32, Position)>> = BinaryHeap::new();
    heap.push(Reverse((grid.heuristic(start, goal), start)));

    let mut neighbors = Vec::with_capacity(8);
    let mut expanded  = 0usize;

    while let Some(Reverse((_, pos))) = heap.pop() {
        let cur = pos.y as usize * grid.width() as usize + pos.x as usize;
        if closed[cur] {
            continue;
        }
        if cur == g {
            debug!(%start, %goal, moves = g_score[g], expanded, "route found");
            return Ok(reconstruct(grid, &prev, s, g));
        }
        closed[cur] = true;
        expanded += 1;

        let tentative = g_score[cur] + 1;
        grid.neighbors_into(pos, &mut neighbors);
        for &next in &neighbors {
            let j = next.y as usize * grid.width() as usize + next.x as usize;
            if closed[j] || tentative >= g_score[j] {
                continue;
            }
            g_score[j] = tentative;
            prev[j]    = cur;
            heap.push(Reverse((tentative + grid.heuristic(next, goal), next)));
        }
    }

    debug!(%start, %goal, expanded, "no path");
    Err(SpatialError::NoPathFound { from: start, to: goal })
}

/// Walk predecessor links from `goal` back to `start` and reverse.
fn reconstruct(grid: &Grid, prev: &[usize], start: usize, goal: usize) -> Route {
    let mut cells = Vec::new();
    let mut cur = goal;
    loop {
        cells.push(grid.position_of(cur));
        if cur == start {
            break;
        }
        cur = prev[cur];
    }
    cells.reverse();
    Route { cells }
}

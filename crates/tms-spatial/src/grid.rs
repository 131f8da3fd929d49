//! Site grid representation.
//!
//! # Data layout
//!
//! Obstacles are a dense row-major `Vec<bool>` of length `width * height`;
//! cell `(x, y)` lives at index `y * width + x`.  The A* inner loop works on
//! these indices directly so it never hashes a coordinate.
//!
//! # Obstacle version
//!
//! Every `set_obstacle` call that actually changes a cell increments
//! `version`.  Anything derived from the layout (cached routes, schedules)
//! records the version it was computed against and is stale once it differs.

use serde::{Deserialize, Serialize};

use tms_core::{Connectivity, DispatchConfig, Position};

use crate::{SpatialError, SpatialResult};

/// Orthogonal steps in a fixed order: up, right, down, left.
const ORTHOGONAL: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Diagonal steps, appended after the orthogonal ones under 8-connectivity.
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// A bounded `width × height` grid with mutable obstacles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridRepr", into = "GridRepr")]
pub struct Grid {
    width:         u32,
    height:        u32,
    connectivity:  Connectivity,
    blocked:       Vec<bool>,
    blocked_count: usize,
    version:       u64,
}

impl Grid {
    /// An obstacle-free grid.
    ///
    /// # Panics
    /// Panics if either dimension is zero or exceeds `i32::MAX`;
    /// `DispatchConfig::validate` rejects those before a grid is built.
    pub fn new(width: u32, height: u32, connectivity: Connectivity) -> Self {
        assert!(width > 0 && height > 0, "grid must be at least 1x1");
        assert!(width <= i32::MAX as u32 && height <= i32::MAX as u32);
        Self {
            width,
            height,
            connectivity,
            blocked: vec![false; width as usize * height as usize],
            blocked_count: 0,
            version: 0,
        }
    }

    /// Grid sized and connected as `config` says.
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.grid_width, config.grid_height, config.connectivity)
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn cell_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked_count
    }

    /// Obstacle version; bumped on every effective `set_obstacle`.
    pub fn version(&self) -> u64 {
        self.version
    }

    // ── Bounds and indexing ───────────────────────────────────────────────

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Dense index of `pos`, or `OutOfBounds`.
    #[inline]
    pub fn index(&self, pos: Position) -> SpatialResult<usize> {
        if self.in_bounds(pos) {
            Ok(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            Err(self.out_of_bounds(pos))
        }
    }

    #[inline]
    pub(crate) fn position_of(&self, index: usize) -> Position {
        let w = self.width as usize;
        Position::new((index % w) as i32, (index / w) as i32)
    }

    fn out_of_bounds(&self, position: Position) -> SpatialError {
        SpatialError::OutOfBounds { position, width: self.width, height: self.height }
    }

    // ── Occupancy ─────────────────────────────────────────────────────────

    pub fn is_blocked(&self, pos: Position) -> SpatialResult<bool> {
        Ok(self.blocked[self.index(pos)?])
    }

    #[inline]
    pub(crate) fn is_blocked_at(&self, index: usize) -> bool {
        self.blocked[index]
    }

    /// Block or clear `pos`.  Returns `true` if the cell changed (and the
    /// obstacle version was bumped).
    pub fn set_obstacle(&mut self, pos: Position, blocked: bool) -> SpatialResult<bool> {
        let i = self.index(pos)?;
        if self.blocked[i] == blocked {
            return Ok(false);
        }
        self.blocked[i] = blocked;
        if blocked {
            self.blocked_count += 1;
        } else {
            self.blocked_count -= 1;
        }
        self.version += 1;
        Ok(true)
    }

    /// All blocked cells in row-major order.
    pub fn obstacles(&self) -> impl Iterator<Item = Position> + '_ {
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| self.position_of(i))
    }

    // ── Adjacency ─────────────────────────────────────────────────────────

    /// In-bounds, unblocked cells reachable from `pos` in one move.
    ///
    /// The order is fixed (up, right, down, left, then diagonals) so that
    /// searches built on it are deterministic.  Diagonal moves require both
    /// adjacent orthogonal cells to be free.
    pub fn neighbors(&self, pos: Position) -> SpatialResult<Vec<Position>> {
        self.index(pos)?;
        let mut out = Vec::with_capacity(8);
        self.neighbors_into(pos, &mut out);
        Ok(out)
    }

    /// Allocation-free core of [`neighbors`][Self::neighbors].  `pos` must be
    /// in bounds.
    pub(crate) fn neighbors_into(&self, pos: Position, out: &mut Vec<Position>) {
        out.clear();
        for (dx, dy) in ORTHOGONAL {
            let next = pos.offset(dx, dy);
            if self.passable(next) {
                out.push(next);
            }
        }
        if self.connectivity == Connectivity::Eight {
            for (dx, dy) in DIAGONAL {
                let next = pos.offset(dx, dy);
                if self.passable(next)
                    && self.passable(pos.offset(dx, 0))
                    && self.passable(pos.offset(0, dy))
                {
                    out.push(next);
                }
            }
        }
    }

    #[inline]
    fn passable(&self, pos: Position) -> bool {
        match self.index(pos) {
            Ok(i) => !self.blocked[i],
            Err(_) => false,
        }
    }

    /// Admissible distance estimate for this grid's connectivity.
    #[inline]
    pub fn heuristic(&self, from: Position, to: Position) -> u32 {
        match self.connectivity {
            Connectivity::Four  => from.manhattan(to),
            Connectivity::Eight => from.chebyshev(to),
        }
    }
}

// ── Serialized form ───────────────────────────────────────────────────────────

/// Sparse on-disk form: dimensions plus the list of blocked cells.
#[derive(Serialize, Deserialize)]
struct GridRepr {
    width:        u32,
    height:       u32,
    connectivity: Connectivity,
    obstacles:    Vec<Position>,
    version:      u64,
}

impl From<Grid> for GridRepr {
    fn from(grid: Grid) -> Self {
        GridRepr {
            width:        grid.width,
            height:       grid.height,
            connectivity: grid.connectivity,
            obstacles:    grid.obstacles().collect(),
            version:      grid.version,
        }
    }
}

impl TryFrom<GridRepr> for Grid {
    type Error = SpatialError;

    fn try_from(repr: GridRepr) -> SpatialResult<Grid> {
        if repr.width == 0 || repr.height == 0 {
            return Err(SpatialError::Malformed(format!(
                "grid dimensions {}x{}",
                repr.width, repr.height
            )));
        }
        if repr.width > i32::MAX as u32 || repr.height > i32::MAX as u32 {
            return Err(SpatialError::Malformed("grid dimensions exceed i32".into()));
        }
        let mut grid = Grid::new(repr.width, repr.height, repr.connectivity);
        for pos in repr.obstacles {
            grid.set_obstacle(pos, true)?;
        }
        grid.version = repr.version;
        Ok(grid)
    }
}

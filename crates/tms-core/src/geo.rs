//! Grid coordinate type.
//!
//! The site is a discrete `W × H` grid.  `Position` is a plain value; whether
//! it lies inside a particular grid is checked by `tms_spatial::Grid`, not
//! here, so coordinates are signed and a neighbour of `(0, 0)` can be
//! expressed (and then rejected as out of bounds).

use serde::{Deserialize, Serialize};

/// A cell on the site grid.
///
/// Ordering is lexicographic on `(x, y)`.  The path planner uses it as the
/// final tie-break between frontier entries of equal cost.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Number of 4-connected moves between the two cells on an open grid.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Number of 8-connected moves between the two cells on an open grid.
    #[inline]
    pub fn chebyshev(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// The cell displaced by `(dx, dy)`.  May lie outside any grid.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position::new(x, y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

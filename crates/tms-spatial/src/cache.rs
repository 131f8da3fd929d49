//! Route cache keyed on the grid's obstacle version.
//!
//! A route is only valid for the obstacle layout it was planned on, so the
//! cache key is `(start, goal, grid.version())`.  A cached entry can never be
//! served after an obstacle changes: the version no longer matches.
//!
//! One `CachingRouter` must only ever see grids of one lineage (a grid and
//! its clones).  Two unrelated grids can share a version number.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use tms_core::Position;

use crate::grid::Grid;
use crate::router::{Route, Router};
use crate::SpatialResult;

type Key = (Position, Position, u64);

/// Memoising wrapper around any [`Router`].  Only successful routes are
/// cached; errors are recomputed.
pub struct CachingRouter<R: Router> {
    inner:    R,
    entries:  Mutex<FxHashMap<Key, Route>>,
    capacity: usize,
    hits:     AtomicU64,
    misses:   AtomicU64,
}

impl<R: Router> CachingRouter<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            entries:  Mutex::new(FxHashMap::default()),
            capacity: capacity.max(1),
            hits:     AtomicU64::new(0),
            misses:   AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: Key, route: Route) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            // Stale versions first; if the current layout alone fills the
            // cache, start over.
            let version = key.2;
            entries.retain(|k, _| k.2 == version);
            if entries.len() >= self.capacity {
                entries.clear();
            }
        }
        entries.insert(key, route);
    }
}

impl<R: Router> Router for CachingRouter<R> {
    fn route(&self, grid: &Grid, start: Position, goal: Position) -> SpatialResult<Route> {
        let key = (start, goal, grid.version());
        if let Some(hit) = self.entries.lock().get(&key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Plan without holding the cache lock.
        let route = self.inner.route(grid, start, goal)?;
        self.insert(key, route.clone());
        Ok(route)
    }
}

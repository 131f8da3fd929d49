//! Router selection: plain or memoised, chosen at build time from config.

use tms_core::Position;
use tms_spatial::{CachingRouter, Grid, Route, Router, SpatialResult};

/// Route entries kept when `cache_routes` is on.
pub const ROUTE_CACHE_CAPACITY: usize = 4_096;

pub enum SiteRouter<R: Router> {
    Direct(R),
    Cached(CachingRouter<R>),
}

impl<R: Router> SiteRouter<R> {
    pub fn new(inner: R, cache: bool) -> Self {
        if cache {
            SiteRouter::Cached(CachingRouter::new(inner, ROUTE_CACHE_CAPACITY))
        } else {
            SiteRouter::Direct(inner)
        }
    }

    /// `(hits, misses)` if caching is on.
    pub fn cache_stats(&self) -> Option<(u64, u64)> {
        match self {
            SiteRouter::Direct(_)     => None,
            SiteRouter::Cached(cache) => Some(cache.stats()),
        }
    }
}

impl<R: Router> Router for SiteRouter<R> {
    fn route(&self, grid: &Grid, start: Position, goal: Position) -> SpatialResult<Route> {
        match self {
            SiteRouter::Direct(r) => r.route(grid, start, goal),
            SiteRouter::Cached(r) => r.route(grid, start, goal),
        }
    }
}

//! Fluent builder for constructing a [`Dispatcher`].

use parking_lot::{Mutex, RwLock};
use tracing::info;

use tms_core::{DispatchConfig, Position};
use tms_exec::TaskExecutor;
use tms_registry::Registry;
use tms_spatial::{AStarRouter, Grid, Router};
use tms_task::TaskBoard;

use crate::dispatcher::State;
use crate::log::EventLog;
use crate::routing::SiteRouter;
use crate::{Dispatcher, DispatchResult, Snapshot};

/// Fluent builder for [`Dispatcher<R>`].
///
/// # Inputs
///
/// | Method              | Default                                  |
/// |---------------------|------------------------------------------|
/// | `new(config)`       | required                                 |
/// | `.with_router(r)`   | [`AStarRouter`]                          |
/// | `.obstacles(cells)` | none                                     |
/// | `.restore(snap)`    | empty site; replaces `config` when given |
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = DispatcherBuilder::new(DispatchConfig::with_grid(20, 20))
///     .obstacles([Position::new(3, 3)])
///     .build()?;
/// ```
pub struct DispatcherBuilder<R: Router = AStarRouter> {
    config:    DispatchConfig,
    router:    R,
    obstacles: Vec<Position>,
    snapshot:  Option<Snapshot>,
}

impl DispatcherBuilder<AStarRouter> {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config, router: AStarRouter, obstacles: Vec::new(), snapshot: None }
    }
}

impl<R: Router> DispatcherBuilder<R> {
    /// Swap the path planner.
    pub fn with_router<R2: Router>(self, router: R2) -> DispatcherBuilder<R2> {
        DispatcherBuilder {
            config:    self.config,
            router,
            obstacles: self.obstacles,
            snapshot:  self.snapshot,
        }
    }

    /// Cells blocked before any entity is added.  Applied on top of a
    /// restored grid as well.
    pub fn obstacles(mut self, cells: impl IntoIterator<Item = Position>) -> Self {
        self.obstacles.extend(cells);
        self
    }

    /// Start from saved state.  The snapshot's config wins over the one
    /// given to [`new`][DispatcherBuilder::new].
    pub fn restore(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Validate inputs and return a ready dispatcher.
    ///
    /// # Errors
    /// `Config` for an invalid config; `Snapshot` (or the wrapped lower
    /// error) for an inconsistent snapshot; `OutOfBounds` for an obstacle
    /// off the grid.
    pub fn build(self) -> DispatchResult<Dispatcher<R>> {
        let (config, mut grid, registry, board, clock) = match self.snapshot {
            Some(snapshot) => {
                snapshot.validate()?;
                let Snapshot { config, grid, registry, board, clock } = snapshot;
                (config, grid, registry, board, clock)
            }
            None => {
                self.config.validate()?;
                let grid = Grid::from_config(&self.config);
                let clock = self.config.make_clock();
                (self.config, grid, Registry::new(), TaskBoard::new(), clock)
            }
        };

        for &cell in &self.obstacles {
            grid.set_obstacle(cell, true)?;
        }
        if !self.obstacles.is_empty() {
            // Re-check entity cells against the extra obstacles.
            Snapshot {
                config:   config.clone(),
                grid:     grid.clone(),
                registry: registry.clone(),
                board:    board.clone(),
                clock:    clock.clone(),
            }
            .validate()?;
        }

        info!(
            width = grid.width(),
            height = grid.height(),
            obstacles = grid.blocked_count(),
            tasks = board.len(),
            policy = ?config.policy,
            "dispatcher ready"
        );

        let executor = TaskExecutor::from_config(SiteRouter::new(self.router, config.cache_routes), &config);
        let log = EventLog::new(config.event_log_capacity);
        Ok(Dispatcher {
            state: Mutex::new(State { registry, board, clock, log }),
            grid: RwLock::new(grid),
            executor,
            config,
        })
    }
}

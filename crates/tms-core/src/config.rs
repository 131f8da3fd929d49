//! Top-level dispatcher configuration.
//!
//! Loaded by the application (the demo reads JSON with `serde_json`) and
//! handed to `tms_dispatch::DispatcherBuilder`.  Every field has a default,
//! so a partial document such as `{"grid_width": 15, "grid_height": 15}` is
//! a complete configuration.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, DispatchClock};

/// Grid adjacency used by every planner call.  Fixed for a grid's lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Up, right, down, left.  Heuristic: Manhattan distance.
    #[default]
    Four,
    /// Four plus diagonals (no corner cutting).  Heuristic: Chebyshev distance.
    Eight,
}

/// Ordering policy for a scheduling pass.  Each variant names a pure
/// ordering function in `tms-schedule`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPolicy {
    /// Priority descending, then deadline ascending (none last), then
    /// creation order.
    #[default]
    PriorityDeadline,
    /// Deadline ascending (none last), then priority descending, then
    /// creation order.
    EarliestDeadline,
    /// Creation order only.
    Fifo,
}

/// Dispatcher configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Grid width `W`; valid x coordinates are `0..W`.
    pub grid_width: u32,
    /// Grid height `H`; valid y coordinates are `0..H`.
    pub grid_height: u32,
    pub connectivity: Connectivity,
    pub policy: SchedulingPolicy,

    /// Unix timestamp of tick 0.
    pub start_unix_secs: i64,
    /// Real seconds per tick.
    pub tick_duration_secs: u32,
    /// Ticks charged per grid move.
    pub ticks_per_move: u32,
    /// Ticks charged per load or unload operation.
    pub handling_ticks: u32,

    /// How many recent events the dispatcher keeps for paging.
    pub event_log_capacity: usize,
    /// Wrap the planner in a route cache keyed on the obstacle version.
    pub cache_routes: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            grid_width:         20,
            grid_height:        20,
            connectivity:       Connectivity::Four,
            policy:             SchedulingPolicy::PriorityDeadline,
            start_unix_secs:    0,
            tick_duration_secs: 60,
            ticks_per_move:     1,
            handling_ticks:     1,
            event_log_capacity: 256,
            cache_routes:       false,
        }
    }
}

impl DispatchConfig {
    /// A default configuration with the given grid size.
    pub fn with_grid(width: u32, height: u32) -> Self {
        Self { grid_width: width, grid_height: height, ..Self::default() }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(CoreError::Config(format!(
                "grid must be at least 1×1, got {}×{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.grid_width > i32::MAX as u32 || self.grid_height > i32::MAX as u32 {
            return Err(CoreError::Config("grid dimensions exceed i32 coordinates".into()));
        }
        if self.tick_duration_secs == 0 {
            return Err(CoreError::Config("tick_duration_secs must be positive".into()));
        }
        if self.ticks_per_move == 0 {
            return Err(CoreError::Config("ticks_per_move must be positive".into()));
        }
        if self.event_log_capacity == 0 {
            return Err(CoreError::Config("event_log_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Construct a `DispatchClock` pre-configured for this run.
    pub fn make_clock(&self) -> DispatchClock {
        DispatchClock::new(self.start_unix_secs, self.tick_duration_secs)
    }
}

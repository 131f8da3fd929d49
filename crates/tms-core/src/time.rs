//! Dispatch time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `Tick` counter owned by the dispatcher.
//! One grid move costs `ticks_per_move` ticks and one load/unload operation
//! costs `handling_ticks` (both from `DispatchConfig`).  The mapping to wall
//! time is held in `DispatchClock`:
//!
//!   wall_time = start_unix_secs + tick * tick_duration_secs
//!
//! Deadlines are expressed as ticks too, so ordering by deadline is an exact
//! integer comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute dispatch tick.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── DispatchClock ─────────────────────────────────────────────────────────────

/// The dispatcher's logical clock.
///
/// Only the executor and equipment moves advance it.  Reads never do, so
/// reports taken back to back see the same `now`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchClock {
    /// Unix timestamp (seconds since epoch) of tick 0.
    pub start_unix_secs: i64,
    /// How many real seconds one tick represents.
    pub tick_duration_secs: u32,
    /// The current tick.
    pub current_tick: Tick,
}

impl DispatchClock {
    pub fn new(start_unix_secs: i64, tick_duration_secs: u32) -> Self {
        Self {
            start_unix_secs,
            tick_duration_secs,
            current_tick: Tick::ZERO,
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.current_tick
    }

    /// Advance the clock by `n` ticks and return the new time.
    #[inline]
    pub fn advance(&mut self, n: u64) -> Tick {
        self.current_tick = self.current_tick.offset(n);
        self.current_tick
    }

    /// Ticks elapsed since tick 0.
    #[inline]
    pub fn elapsed_ticks(&self) -> u64 {
        self.current_tick.0
    }

    /// Unix timestamp corresponding to `tick`.
    #[inline]
    pub fn unix_secs_at(&self, tick: Tick) -> i64 {
        self.start_unix_secs + tick.0 as i64 * self.tick_duration_secs as i64
    }

    /// Current Unix timestamp.
    #[inline]
    pub fn current_unix_secs(&self) -> i64 {
        self.unix_secs_at(self.current_tick)
    }

    /// How many ticks span `secs` seconds? (rounds up, so a deadline
    /// converted this way is never earlier than requested)
    #[inline]
    pub fn ticks_for_secs(&self, secs: u64) -> u64 {
        secs.div_ceil(self.tick_duration_secs.max(1) as u64)
    }

    /// The tick `hours` hours from now; the usual way to build a deadline.
    pub fn deadline_in_hours(&self, hours: u64) -> Tick {
        self.current_tick.offset(self.ticks_for_secs(hours * 3_600))
    }
}

impl Default for DispatchClock {
    fn default() -> Self {
        Self::new(0, 60)
    }
}

impl fmt::Display for DispatchClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{} s)", self.current_tick, self.current_tick.0 * self.tick_duration_secs as u64)
    }
}

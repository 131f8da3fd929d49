//! `tms-schedule` — which pending task runs next, and with what.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                |
//! |-----------------|---------------------------------------------------------|
//! | [`policy`]      | `compare`, `order_tasks` per `SchedulingPolicy`         |
//! | [`requirement`] | `requirements_for`, `check_crew`, `verify_crew`         |
//! | [`optimize`]    | `optimize_schedule`, `projected_ledger`, `Schedule`     |
//! | [`error`]       | `ScheduleError`, `ScheduleResult<T>`                    |
//!
//! # Guarantees of a schedule
//!
//! Relative to the registry snapshot it was computed from:
//!
//! - no equipment appears in two assignments;
//! - applying the stock changes of every task already Assigned, then of the
//!   assigned tasks in schedule order, never drives a quantity negative or
//!   a warehouse over capacity;
//! - the same inputs always give the same schedule.

pub mod error;
pub mod optimize;
pub mod policy;
pub mod requirement;

#[cfg(test)]
mod tests;

pub use error::{ScheduleError, ScheduleResult};
pub use optimize::{Assignment, Deferral, Schedule, optimize_schedule, projected_ledger};
pub use policy::{compare, order_tasks};
pub use requirement::{Requirement, Role, check_crew, requirements_for, verify_crew};

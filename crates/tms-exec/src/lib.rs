//! `tms-exec` — drives an assigned task to completion or failure.
//!
//! # Crate layout
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`executor`] | `TaskExecutor`, `Site`, `ExecutionOutcome`, `Leg`      |
//! | [`movement`] | `TaskExecutor::move_equipment`, `MoveOutcome`          |
//! | [`error`]    | `ExecError`, `ExecResult<T>`                           |
//!
//! # Transaction shape
//!
//! ```text
//! check task Assigned ─▶ begin ─▶ re-check crew ─▶ mark Busy ─▶ plan legs
//!        │                                                          │
//!   Err (no change)                               apply stock batch (last fallible step)
//!                                                   │                      │
//!                                   ok: move crew, advance clock,    err: release crew,
//!                                       complete, release crew           fail task
//! ```
//!
//! Everything after `begin` either commits in full or leaves stock and
//! equipment positions exactly as they were.

pub mod error;
pub mod executor;
pub mod movement;


pub use error::{ExecError, ExecResult};
pub use executor::{ExecutionOutcome, Leg, Site, TaskExecutor};
pub use movement::MoveOutcome;

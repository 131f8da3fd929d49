//! `tms-task` — typed work units and their lifecycle.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`spec`]     | `TaskSpec` (per-kind warehouse references), `ShipPlan`     |
//! | [`task`]     | `Task`, `TaskDraft`, transition methods                    |
//! | [`board`]    | `TaskBoard` — id generation, storage, counts               |
//! | [`validate`] | draft validation against a `Registry`, ship source lookup  |
//! | [`error`]    | `TaskError`, `TaskResult<T>`                               |
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──assign──▶ Assigned ──begin──▶ InProgress ──complete──▶ Completed
//!    │                   │                    └───────fail───────▶ Failed
//!    └──────cancel───────┴──▶ Cancelled
//! ```
//!
//! Transitions only move forward.  An illegal transition returns
//! `InvalidTransition` and leaves the task untouched.

pub mod board;
pub mod error;
pub mod spec;
pub mod task;
pub mod validate;


pub use board::{StatusCounts, TaskBoard};
pub use error::{TaskError, TaskResult};
pub use spec::{ShipPlan, TaskSpec};
pub use task::{Task, TaskDraft};
pub use validate::{resolve_ship_source, validate_draft};

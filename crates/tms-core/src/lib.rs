//! `tms-core` — foundational types for the site dispatch engine.
//!
//! This crate is a dependency of every other `tms-*` crate.  It has no
//! `tms-*` dependencies and only `thiserror` and `serde` as external ones.
//!
//! # What lives here
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`ids`]    | `ProductId`, `WarehouseId`, `EquipmentId`, `TaskId`         |
//! | [`geo`]    | `Position`, Manhattan / Chebyshev distance                  |
//! | [`time`]   | `Tick`, `DispatchClock`                                     |
//! | [`config`] | `DispatchConfig`, `Connectivity`, `SchedulingPolicy`        |
//! | [`kind`]   | `TaskKind`, `TaskStatus`, `EquipmentStatus`                 |
//! | [`event`]  | `DispatchEvent`                                             |
//! | [`error`]  | `ErrorKind`, `CoreError`, `CoreResult`                      |

pub mod config;
pub mod error;
pub mod event;
pub mod geo;
pub mod ids;
pub mod kind;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{Connectivity, DispatchConfig, SchedulingPolicy};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use event::DispatchEvent;
pub use geo::Position;
pub use ids::{EquipmentId, ProductId, TaskId, WarehouseId};
pub use kind::{EquipmentStatus, TaskKind, TaskStatus};
pub use time::{DispatchClock, Tick};

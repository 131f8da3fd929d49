//! `tms-dispatch` — the site dispatcher.
//!
//! [`Dispatcher`] is the one entry point collaborators use: entity CRUD,
//! task creation, manual and optimised assignment, execution, grid edits,
//! reports and snapshots.  There is no global instance; build one with
//! [`DispatcherBuilder`] and share it behind an `Arc` if needed.
//!
//! # Crate layout
//!
//! | Module         | Contents                                              |
//! |----------------|-------------------------------------------------------|
//! | [`dispatcher`] | `Dispatcher`, `ShipOrder`                             |
//! | [`builder`]    | `DispatcherBuilder`                                   |
//! | [`report`]     | `SystemStatus`, `PerformanceReport`                   |
//! | [`snapshot`]   | `Snapshot` (save/restore contract)                    |
//! | [`routing`]    | `SiteRouter` (plain or cached planner)                |
//! | [`error`]      | `DispatchError`, `DispatchResult<T>`                  |
//!
//! # Events
//!
//! Every mutation's [`DispatchEvent`][tms_core::DispatchEvent]s go into a
//! bounded recent log ([`Dispatcher::recent_events`]) and out to every
//! channel handed out by [`Dispatcher::subscribe`].

pub mod builder;
pub mod dispatcher;
pub mod error;
mod log;
pub mod report;
pub mod routing;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use builder::DispatcherBuilder;
pub use dispatcher::{Dispatcher, ShipOrder};
pub use error::{DispatchError, DispatchResult};
pub use report::{
    EquipmentCounts, EquipmentUtilization, KindStats, PerformanceReport, SystemStatus, WarehouseUtilization,
};
pub use routing::SiteRouter;
pub use snapshot::Snapshot;

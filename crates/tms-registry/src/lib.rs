//! `tms-registry` — the combined inventory and equipment store.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`product`]    | `Product`, `ProductUpdate`                                |
//! | [`warehouse`]  | `Warehouse`, `WarehouseKind`, `CapacityBasis`             |
//! | [`equipment`]  | `Equipment`, `EquipmentKind`                              |
//! | [`capability`] | `SiteAsset` — position / capacity / accepts(kind)         |
//! | [`registry`]   | `Registry`, `StockDelta`                                  |
//! | [`error`]      | `RegistryError`, `RegistryResult<T>`                      |
//!
//! # Invariants
//!
//! - Ids are unique per entity family.
//! - For every warehouse, Σ quantity × unit measure ≤ capacity, and no
//!   quantity is negative.  A failed stock mutation leaves stock unchanged.
//! - Equipment is held (`Assigned`/`Busy`) by at most one task, recorded in
//!   `Equipment::current_task`.
//!
//! `Registry` itself is single-threaded; the dispatcher serializes access
//! behind one lock.

pub mod capability;
pub mod equipment;
pub mod error;
pub mod product;
pub mod registry;
pub mod warehouse;


pub use capability::SiteAsset;
pub use equipment::{Equipment, EquipmentKind, EquipmentUpdate};
pub use error::{RegistryError, RegistryResult};
pub use product::{Product, ProductUpdate};
pub use registry::{Registry, StockDelta};
pub use warehouse::{CapacityBasis, Warehouse, WarehouseKind, WarehouseUpdate};

//! The capability surface shared by equipment and warehouses.

use tms_core::{Position, TaskKind};

/// Anything placed on the site grid that takes part in tasks.
pub trait SiteAsset {
    fn position(&self) -> Position;

    /// Handling capacity: tonnes per lift for equipment, storage capacity
    /// (in the warehouse's capacity basis) for warehouses.
    fn capacity(&self) -> f64;

    /// Whether this asset can take part in a task of `kind`.
    fn accepts(&self, kind: TaskKind) -> bool;
}

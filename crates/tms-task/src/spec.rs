//! Per-kind task parameters.

use serde::{Deserialize, Serialize};

use tms_core::{Position, TaskKind, WarehouseId};

/// Shipment metadata carried by a ship transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlan {
    /// Vessel name.
    pub carrier:     String,
    pub destination: String,
    /// Quay cell the truck delivers to.  Without one the goods leave the
    /// site from the source warehouse.
    #[serde(default)]
    pub berth:       Option<Position>,
}

impl ShipPlan {
    pub fn new(carrier: impl Into<String>, destination: impl Into<String>) -> Self {
        Self { carrier: carrier.into(), destination: destination.into(), berth: None }
    }

    pub fn with_berth(mut self, berth: Position) -> Self {
        self.berth = Some(berth);
        self
    }
}

/// What a task does and which warehouses it touches.
///
/// Stock effect on completion:
///
/// | Variant            | Source        | Target        |
/// |--------------------|---------------|---------------|
/// | `ShipTransport`    | `source` −    | (off site)    |
/// | `InternalTransfer` | `source` −    | `target` +    |
/// | `Load`             | `warehouse` − | (onto truck)  |
/// | `Unload`           | (off truck)   | `warehouse` + |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSpec {
    ShipTransport { plan: ShipPlan, source: WarehouseId },
    InternalTransfer { source: WarehouseId, target: WarehouseId },
    Load { warehouse: WarehouseId },
    Unload { warehouse: WarehouseId },
}

impl TaskSpec {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskSpec::ShipTransport { .. }    => TaskKind::ShipTransport,
            TaskSpec::InternalTransfer { .. } => TaskKind::InternalTransfer,
            TaskSpec::Load { .. }             => TaskKind::Load,
            TaskSpec::Unload { .. }           => TaskKind::Unload,
        }
    }

    /// Warehouse whose stock decreases.
    pub fn source(&self) -> Option<&WarehouseId> {
        match self {
            TaskSpec::ShipTransport { source, .. } | TaskSpec::InternalTransfer { source, .. } => Some(source),
            TaskSpec::Load { warehouse } => Some(warehouse),
            TaskSpec::Unload { .. } => None,
        }
    }

    /// Warehouse whose stock increases.
    pub fn target(&self) -> Option<&WarehouseId> {
        match self {
            TaskSpec::InternalTransfer { target, .. } => Some(target),
            TaskSpec::Unload { warehouse } => Some(warehouse),
            TaskSpec::ShipTransport { .. } | TaskSpec::Load { .. } => None,
        }
    }

    /// Where equipment must go to start the work.
    pub fn pickup(&self) -> &WarehouseId {
        match self {
            TaskSpec::ShipTransport { source, .. } | TaskSpec::InternalTransfer { source, .. } => source,
            TaskSpec::Load { warehouse } | TaskSpec::Unload { warehouse } => warehouse,
        }
    }

    pub fn ship_plan(&self) -> Option<&ShipPlan> {
        match self {
            TaskSpec::ShipTransport { plan, .. } => Some(plan),
            _ => None,
        }
    }

    /// Every warehouse this task references.
    pub fn warehouses(&self) -> impl Iterator<Item = &WarehouseId> {
        self.source().into_iter().chain(self.target())
    }
}

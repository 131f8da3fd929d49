//! Task kinds and lifecycle statuses shared by the registry, task, and
//! dispatch crates.

use serde::{Deserialize, Serialize};

/// The four task variants.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Outbound shipment: stock leaves a finished-goods warehouse for a ship.
    ShipTransport,
    /// Stock moves from one site warehouse to another.
    InternalTransfer,
    /// Stock is loaded out of a warehouse onto a carrier.
    Load,
    /// Stock is unloaded from a carrier into a warehouse.
    Unload,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::ShipTransport,
        TaskKind::InternalTransfer,
        TaskKind::Load,
        TaskKind::Unload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::ShipTransport    => "ship_transport",
            TaskKind::InternalTransfer => "internal_transfer",
            TaskKind::Load             => "load",
            TaskKind::Unload           => "unload",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle status.
///
/// Transitions are monotonic:
///
/// ```text
/// Pending ──assign──▶ Assigned ──begin──▶ InProgress ──complete──▶ Completed
///    │                   │                    └───────fail───────▶ Failed
///    └──────cancel───────┴──▶ Cancelled
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `Completed`, `Failed`, and `Cancelled` never transition further.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    /// `Assigned` or `InProgress`: the task holds equipment.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskStatus::Assigned | TaskStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending    => "pending",
            TaskStatus::Assigned   => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed  => "completed",
            TaskStatus::Failed     => "failed",
            TaskStatus::Cancelled  => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equipment availability.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Idle,
    /// Reserved by exactly one task that has not started yet.
    Assigned,
    /// Working on exactly one in-progress task, or moving.
    Busy,
    /// Under maintenance; never eligible for assignment.
    OutOfService,
}

impl EquipmentStatus {
    /// `Assigned` or `Busy`.
    #[inline]
    pub fn is_held(self) -> bool {
        matches!(self, EquipmentStatus::Assigned | EquipmentStatus::Busy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentStatus::Idle         => "idle",
            EquipmentStatus::Assigned     => "assigned",
            EquipmentStatus::Busy         => "busy",
            EquipmentStatus::OutOfService => "out_of_service",
        }
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

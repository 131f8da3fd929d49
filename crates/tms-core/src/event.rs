//! Structured state-transition events.
//!
//! Every registry and task mutation returns the event(s) it produced instead
//! of notifying subscribers.  The dispatcher forwards them on a channel and
//! keeps a bounded recent log; reporting and output collaborators consume
//! them from there.

use serde::{Deserialize, Serialize};

use crate::{EquipmentId, EquipmentStatus, Position, ProductId, TaskId, TaskKind, Tick, WarehouseId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    TaskCreated {
        task:     TaskId,
        kind:     TaskKind,
        priority: i32,
        tick:     Tick,
    },
    TaskAssigned {
        task:      TaskId,
        equipment: Vec<EquipmentId>,
        tick:      Tick,
    },
    TaskStarted {
        task: TaskId,
        tick: Tick,
    },
    TaskCompleted {
        task: TaskId,
        tick: Tick,
    },
    TaskFailed {
        task:   TaskId,
        reason: String,
        tick:   Tick,
    },
    TaskCancelled {
        task: TaskId,
        tick: Tick,
    },
    EquipmentStatusChanged {
        equipment: EquipmentId,
        from:      EquipmentStatus,
        to:        EquipmentStatus,
        tick:      Tick,
    },
    EquipmentMoved {
        equipment: EquipmentId,
        from:      Position,
        to:        Position,
        moves:     u32,
        tick:      Tick,
    },
    FrameAttached {
        truck: EquipmentId,
        frame: EquipmentId,
        tick:  Tick,
    },
    FrameDetached {
        truck: EquipmentId,
        frame: EquipmentId,
        tick:  Tick,
    },
    StockAdjusted {
        warehouse: WarehouseId,
        product:   ProductId,
        delta:     i64,
        quantity:  u64,
        tick:      Tick,
    },
    ObstacleChanged {
        position: Position,
        blocked:  bool,
        version:  u64,
    },
}

impl DispatchEvent {
    /// Short machine-readable name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            DispatchEvent::TaskCreated { .. }            => "task_created",
            DispatchEvent::TaskAssigned { .. }           => "task_assigned",
            DispatchEvent::TaskStarted { .. }            => "task_started",
            DispatchEvent::TaskCompleted { .. }          => "task_completed",
            DispatchEvent::TaskFailed { .. }             => "task_failed",
            DispatchEvent::TaskCancelled { .. }          => "task_cancelled",
            DispatchEvent::EquipmentStatusChanged { .. } => "equipment_status_changed",
            DispatchEvent::EquipmentMoved { .. }         => "equipment_moved",
            DispatchEvent::FrameAttached { .. }          => "frame_attached",
            DispatchEvent::FrameDetached { .. }          => "frame_detached",
            DispatchEvent::StockAdjusted { .. }          => "stock_adjusted",
            DispatchEvent::ObstacleChanged { .. }        => "obstacle_changed",
        }
    }

    /// Tick at which the event happened.  Obstacle changes are not clocked.
    pub fn tick(&self) -> Option<Tick> {
        match self {
            DispatchEvent::TaskCreated { tick, .. }
            | DispatchEvent::TaskAssigned { tick, .. }
            | DispatchEvent::TaskStarted { tick, .. }
            | DispatchEvent::TaskCompleted { tick, .. }
            | DispatchEvent::TaskFailed { tick, .. }
            | DispatchEvent::TaskCancelled { tick, .. }
            | DispatchEvent::EquipmentStatusChanged { tick, .. }
            | DispatchEvent::EquipmentMoved { tick, .. }
            | DispatchEvent::FrameAttached { tick, .. }
            | DispatchEvent::FrameDetached { tick, .. }
            | DispatchEvent::StockAdjusted { tick, .. } => Some(*tick),
            DispatchEvent::ObstacleChanged { .. } => None,
        }
    }

    /// One-line human-readable description, used by the execution log.
    pub fn describe(&self) -> String {
        match self {
            DispatchEvent::TaskCreated { task, kind, priority, .. } => {
                format!("task {task} created ({kind}, priority {priority})")
            }
            DispatchEvent::TaskAssigned { task, equipment, .. } => {
                let names: Vec<&str> = equipment.iter().map(EquipmentId::as_str).collect();
                format!("task {task} assigned to [{}]", names.join(", "))
            }
            DispatchEvent::TaskStarted { task, .. }   => format!("task {task} started"),
            DispatchEvent::TaskCompleted { task, .. } => format!("task {task} completed"),
            DispatchEvent::TaskFailed { task, reason, .. } => {
                format!("task {task} failed: {reason}")
            }
            DispatchEvent::TaskCancelled { task, .. } => format!("task {task} cancelled"),
            DispatchEvent::EquipmentStatusChanged { equipment, from, to, .. } => {
                format!("equipment {equipment} {from} -> {to}")
            }
            DispatchEvent::EquipmentMoved { equipment, from, to, moves, .. } => {
                format!("equipment {equipment} moved {from} -> {to} in {moves} moves")
            }
            DispatchEvent::FrameAttached { truck, frame, .. } => format!("frame {frame} hitched to {truck}"),
            DispatchEvent::FrameDetached { truck, frame, .. } => format!("frame {frame} unhitched from {truck}"),
            DispatchEvent::StockAdjusted { warehouse, product, delta, quantity, .. } => {
                format!("warehouse {warehouse} stock of {product} {delta:+} (now {quantity})")
            }
            DispatchEvent::ObstacleChanged { position, blocked, version } => {
                let verb = if *blocked { "blocked" } else { "cleared" };
                format!("cell {position} {verb} (obstacle version {version})")
            }
        }
    }
}

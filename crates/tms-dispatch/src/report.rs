//! Status and performance reports.
//!
//! Both are computed from a consistent view of the state (taken under the
//! state lock) and returned as plain serialisable values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tms_core::{
    DispatchClock, DispatchEvent, EquipmentId, EquipmentStatus, TaskKind, TaskStatus, Tick, WarehouseId,
};
use tms_registry::{EquipmentKind, Registry, WarehouseKind};
use tms_spatial::Grid;
use tms_task::{StatusCounts, TaskBoard};

/// Events the performance report carries.
pub const REPORT_RECENT_EVENTS: usize = 20;

// ── System status ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentCounts {
    pub idle:           usize,
    pub assigned:       usize,
    pub busy:           usize,
    pub out_of_service: usize,
}

impl EquipmentCounts {
    pub fn total(&self) -> usize {
        self.idle + self.assigned + self.busy + self.out_of_service
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseUtilization {
    pub id:              WarehouseId,
    pub name:            String,
    pub kind:            WarehouseKind,
    pub load:            f64,
    pub capacity:        f64,
    /// 0–100.
    pub utilization_pct: f64,
    pub available:       f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub products:        usize,
    pub warehouses:      usize,
    pub equipment:       usize,
    pub tasks:           StatusCounts,
    /// Assigned or in progress.
    pub active_tasks:    usize,
    pub pending_tasks:   usize,
    pub by_status:       EquipmentCounts,
    pub utilization:     Vec<WarehouseUtilization>,
    pub grid_width:      u32,
    pub grid_height:     u32,
    pub obstacles:       usize,
    pub obstacle_version: u64,
    pub tick:            Tick,
}

pub(crate) fn system_status(registry: &Registry, board: &TaskBoard, clock: &DispatchClock, grid: &Grid) -> SystemStatus {
    let tasks = board.counts();

    let mut by_status = EquipmentCounts::default();
    for equipment in registry.fleet() {
        match equipment.status {
            EquipmentStatus::Idle         => by_status.idle += 1,
            EquipmentStatus::Assigned     => by_status.assigned += 1,
            EquipmentStatus::Busy         => by_status.busy += 1,
            EquipmentStatus::OutOfService => by_status.out_of_service += 1,
        }
    }

    let catalog = registry.catalog();
    let utilization = registry
        .warehouses()
        .map(|w| WarehouseUtilization {
            id:              w.id.clone(),
            name:            w.name.clone(),
            kind:            w.kind,
            load:            w.load(catalog),
            capacity:        w.capacity,
            utilization_pct: w.utilization(catalog),
            available:       w.available_capacity(catalog),
        })
        .collect();

    SystemStatus {
        products: registry.products().count(),
        warehouses: registry.warehouses().count(),
        equipment: by_status.total(),
        active_tasks: tasks.assigned + tasks.in_progress,
        pending_tasks: tasks.pending,
        tasks,
        by_status,
        utilization,
        grid_width: grid.width(),
        grid_height: grid.height(),
        obstacles: grid.blocked_count(),
        obstacle_version: grid.version(),
        tick: clock.now(),
    }
}

// ── Performance report ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KindStats {
    pub total:     usize,
    pub completed: usize,
    pub failed:    usize,
    /// Mean start-to-finish ticks of completed tasks of this kind.
    pub average_execution_ticks: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentUtilization {
    pub id:          EquipmentId,
    pub kind:        EquipmentKind,
    pub busy_ticks:  u64,
    /// Busy ticks over elapsed ticks, 0–1; `None` before the clock moves.
    pub utilization: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total:     usize,
    pub completed: usize,
    pub failed:    usize,
    pub cancelled: usize,
    /// Completed / (completed + failed); `None` until a task finishes.
    pub success_rate: Option<f64>,
    pub average_execution_ticks: Option<f64>,
    pub per_kind:      BTreeMap<TaskKind, KindStats>,
    pub equipment:     Vec<EquipmentUtilization>,
    pub elapsed_ticks: u64,
    /// Newest first.
    pub recent_events: Vec<DispatchEvent>,
}

pub(crate) fn performance_report(
    registry: &Registry,
    board: &TaskBoard,
    clock: &DispatchClock,
    recent_events: Vec<DispatchEvent>,
) -> PerformanceReport {
    let counts = board.counts();
    let finished = counts.completed + counts.failed;
    let success_rate = (finished > 0).then(|| counts.completed as f64 / finished as f64);

    let mut per_kind: BTreeMap<TaskKind, KindStats> = TaskKind::ALL.iter().map(|k| (*k, KindStats::default())).collect();
    let mut durations: BTreeMap<TaskKind, (u64, usize)> = BTreeMap::new();
    for task in board.iter() {
        let stats = per_kind.entry(task.kind()).or_default();
        stats.total += 1;
        match task.status {
            TaskStatus::Completed => {
                stats.completed += 1;
                if let Some(ticks) = task.execution_ticks() {
                    let slot = durations.entry(task.kind()).or_default();
                    slot.0 += ticks;
                    slot.1 += 1;
                }
            }
            TaskStatus::Failed => stats.failed += 1,
            _ => {}
        }
    }
    for (kind, (sum, n)) in &durations {
        if let Some(stats) = per_kind.get_mut(kind) {
            stats.average_execution_ticks = Some(*sum as f64 / *n as f64);
        }
    }
    let (sum, n) = durations.values().fold((0u64, 0usize), |(s, c), (ds, dc)| (s + ds, c + dc));
    let average_execution_ticks = (n > 0).then(|| sum as f64 / n as f64);

    let now = clock.now();
    let elapsed = clock.elapsed_ticks();
    let equipment = registry
        .fleet()
        .map(|e| {
            let busy_ticks = e.busy_ticks_at(now);
            EquipmentUtilization {
                id: e.id.clone(),
                kind: e.kind,
                busy_ticks,
                utilization: (elapsed > 0).then(|| (busy_ticks as f64 / elapsed as f64).min(1.0)),
            }
        })
        .collect();

    PerformanceReport {
        total: counts.total(),
        completed: counts.completed,
        failed: counts.failed,
        cancelled: counts.cancelled,
        success_rate,
        average_execution_ticks,
        per_kind,
        equipment,
        elapsed_ticks: elapsed,
        recent_events,
    }
}

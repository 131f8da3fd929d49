//! Plain data row types written by output backends.

use tms_core::{DispatchEvent, Tick};
use tms_task::Task;

/// One dispatch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// Position in the recorded stream, from 0.
    pub seq:            u64,
    /// `None` for unclocked events (obstacle changes).
    pub tick:           Option<u64>,
    pub unix_time_secs: Option<i64>,
    pub event:          &'static str,
    /// Id of the task, equipment or warehouse the event is about, or the
    /// cell for obstacle changes.
    pub subject:        String,
    pub detail:         String,
}

impl EventRow {
    /// `start_unix_secs` and `tick_duration_secs` convert ticks to wall time.
    pub fn from_event(seq: u64, event: &DispatchEvent, start_unix_secs: i64, tick_duration_secs: u32) -> Self {
        let tick = event.tick();
        EventRow {
            seq,
            tick: tick.map(|Tick(t)| t),
            unix_time_secs: tick.map(|Tick(t)| start_unix_secs + t as i64 * tick_duration_secs as i64),
            event: event.name(),
            subject: subject(event),
            detail: event.describe(),
        }
    }
}

fn subject(event: &DispatchEvent) -> String {
    match event {
        DispatchEvent::TaskCreated { task, .. }
        | DispatchEvent::TaskAssigned { task, .. }
        | DispatchEvent::TaskStarted { task, .. }
        | DispatchEvent::TaskCompleted { task, .. }
        | DispatchEvent::TaskFailed { task, .. }
        | DispatchEvent::TaskCancelled { task, .. } => task.to_string(),
        DispatchEvent::EquipmentStatusChanged { equipment, .. }
        | DispatchEvent::EquipmentMoved { equipment, .. } => equipment.to_string(),
        DispatchEvent::FrameAttached { truck, .. } | DispatchEvent::FrameDetached { truck, .. } => truck.to_string(),
        DispatchEvent::StockAdjusted { warehouse, .. } => warehouse.to_string(),
        DispatchEvent::ObstacleChanged { position, .. } => position.to_string(),
    }
}

/// Final state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub task_id:        String,
    pub kind:           &'static str,
    pub status:         &'static str,
    pub priority:       i32,
    pub deadline:       Option<u64>,
    pub created:        u64,
    pub started:        Option<u64>,
    pub finished:       Option<u64>,
    /// `;`-separated equipment ids.
    pub equipment:      String,
    /// `;`-separated `product=quantity` pairs.
    pub products:       String,
    /// Empty unless the task failed.
    pub failure_reason: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        let equipment: Vec<&str> = task.equipment.iter().map(|e| e.as_str()).collect();
        let products: Vec<String> = task.products.iter().map(|(p, q)| format!("{p}={q}")).collect();
        TaskRow {
            task_id:        task.id.to_string(),
            kind:           task.kind().as_str(),
            status:         task.status.as_str(),
            priority:       task.priority,
            deadline:       task.deadline.map(|t| t.0),
            created:        task.created.0,
            started:        task.started.map(|t| t.0),
            finished:       task.finished.map(|t| t.0),
            equipment:      equipment.join(";"),
            products:       products.join(";"),
            failure_reason: task.failure_reason.clone().unwrap_or_default(),
        }
    }
}

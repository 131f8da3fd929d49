//! The task execution transaction.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tms_core::{
    DispatchClock, DispatchConfig, DispatchEvent, EquipmentId, EquipmentStatus, Position, TaskId,
    TaskStatus, Tick,
};
use tms_registry::{EquipmentKind, Registry};
use tms_schedule::verify_crew;
use tms_spatial::{Grid, Router};
use tms_task::{Task, TaskBoard, TaskError, TaskSpec};

use crate::ExecResult;

/// Mutable site state an execution works on.  The dispatcher builds one
/// from its locked state for each call.
pub struct Site<'a> {
    pub board:    &'a mut TaskBoard,
    pub registry: &'a mut Registry,
    pub clock:    &'a mut DispatchClock,
    pub grid:     &'a Grid,
}

/// The path one crew member travels: approach to the pickup warehouse, then
/// (haulers only) on to the drop-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub equipment: EquipmentId,
    pub path:      Vec<Position>,
}

impl Leg {
    pub fn moves(&self) -> u32 {
        self.path.len().saturating_sub(1) as u32
    }

    pub fn start(&self) -> Option<Position> {
        self.path.first().copied()
    }

    pub fn end(&self) -> Option<Position> {
        self.path.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub task:     TaskId,
    pub success:  bool,
    /// Why the task failed; `None` on success.
    pub reason:   Option<String>,
    /// Planned legs; empty if the task failed before planning finished.
    pub legs:     Vec<Leg>,
    pub started:  Tick,
    pub finished: Tick,
    /// Every event the execution produced, in order.
    pub events:   Vec<DispatchEvent>,
}

/// Legs and duration, worked out before stock is touched.
struct Plan {
    legs:     Vec<Leg>,
    duration: u64,
}

/// Wraps a [`Router`] with the timing model used to execute tasks.
///
/// `R` is fixed at compile time, as with the scheduler, so the dispatcher can
/// use a plain [`tms_spatial::AStarRouter`] or the caching wrapper.
pub struct TaskExecutor<R: Router> {
    pub router:     R,
    ticks_per_move: u32,
    handling_ticks: u32,
}

impl<R: Router> TaskExecutor<R> {
    pub fn new(router: R, ticks_per_move: u32, handling_ticks: u32) -> Self {
        Self { router, ticks_per_move, handling_ticks }
    }

    pub fn from_config(router: R, config: &DispatchConfig) -> Self {
        Self::new(router, config.ticks_per_move, config.handling_ticks)
    }

    pub fn ticks_per_move(&self) -> u32 {
        self.ticks_per_move
    }

    /// Execute Assigned task `id`.
    ///
    /// Returns `Err` without changing anything if the task does not exist
    /// or is not Assigned.  Otherwise the task ends Completed or Failed and
    /// the outcome says which; every crew member is Idle again either way.
    pub fn execute(&self, id: &TaskId, site: Site<'_>) -> ExecResult<ExecutionOutcome> {
        let Site { board, registry, clock, grid } = site;
        let task = board.get(id)?;
        if task.status != TaskStatus::Assigned {
            return Err(TaskError::InvalidTransition { task: id.clone(), from: task.status, action: "execute" }.into());
        }
        let task = task.clone();
        let now = clock.now();

        let mut events = vec![board.get_mut(id)?.begin(now)?];
        match self.prepare(&task, registry, grid, now, &mut events) {
            Ok(plan) => {
                let finish = now + plan.duration;
                // Last fallible step: the stock batch is all-or-nothing.
                match registry.apply_stock_deltas(&task.stock_deltas(), finish) {
                    Ok(stock) => {
                        events.extend(stock);
                        self.commit(&task, plan, board, registry, clock, events)
                    }
                    Err(e) => {
                        let legs = plan.legs;
                        let mut outcome = self.abort(&task, e.to_string(), board, registry, now, events)?;
                        outcome.legs = legs;
                        Ok(outcome)
                    }
                }
            }
            Err(reason) => self.abort(&task, reason, board, registry, now, events),
        }
    }

    /// Crew check against current requirements, Busy marking, and routing.
    /// Touches only equipment status.
    fn prepare(
        &self,
        task: &Task,
        registry: &mut Registry,
        grid: &Grid,
        now: Tick,
        events: &mut Vec<DispatchEvent>,
    ) -> Result<Plan, String> {
        if task.equipment.is_empty() {
            return Err("no equipment assigned".into());
        }
        for id in &task.equipment {
            let equipment = registry.equipment(id).map_err(|e| e.to_string())?;
            if equipment.status != EquipmentStatus::Assigned || !equipment.is_held_by(&task.id) {
                return Err(format!("equipment {id} is {} and no longer held by the task", equipment.status));
            }
        }
        verify_crew(task, registry).map_err(|e| format!("crew no longer fits: {e}"))?;
        for id in &task.equipment {
            events.push(registry.mark_busy(id, &task.id, now).map_err(|e| e.to_string())?);
        }

        let pickup = registry.warehouse(task.spec.pickup()).map_err(|e| e.to_string())?.position;
        let dropoff = match &task.spec {
            TaskSpec::InternalTransfer { target, .. } => {
                Some(registry.warehouse(target).map_err(|e| e.to_string())?.position)
            }
            TaskSpec::ShipTransport { plan, .. } => plan.berth,
            TaskSpec::Load { .. } | TaskSpec::Unload { .. } => None,
        };

        let mut legs = Vec::with_capacity(task.equipment.len());
        for id in &task.equipment {
            let equipment = registry.equipment(id).map_err(|e| e.to_string())?;
            let approach = self
                .router
                .route(grid, equipment.position, pickup)
                .map_err(|e| format!("{id} to pickup: {e}"))?;
            let mut path = approach.cells;
            if let (EquipmentKind::FrameTruck, Some(dropoff)) = (equipment.kind, dropoff) {
                let delivery = self
                    .router
                    .route(grid, pickup, dropoff)
                    .map_err(|e| format!("{id} to drop-off: {e}"))?;
                path.extend_from_slice(&delivery.cells[1..]);
            }
            debug!(task = %task.id, equipment = %id, moves = path.len() - 1, "leg planned");
            legs.push(Leg { equipment: id.clone(), path });
        }

        let longest = legs.iter().map(Leg::moves).max().unwrap_or(0) as u64;
        let duration = longest * self.ticks_per_move as u64 + self.handling_ticks as u64;
        Ok(Plan { legs, duration })
    }

    /// Stock is already applied; move the crew, advance the clock, and close
    /// the task.
    fn commit(
        &self,
        task: &Task,
        plan: Plan,
        board: &mut TaskBoard,
        registry: &mut Registry,
        clock: &mut DispatchClock,
        mut events: Vec<DispatchEvent>,
    ) -> ExecResult<ExecutionOutcome> {
        let started = clock.now();
        let finish = clock.advance(plan.duration);

        for leg in &plan.legs {
            let Some(to) = leg.end() else { continue };
            let from = registry.relocate_equipment(&leg.equipment, to)?;
            if leg.moves() > 0 {
                events.push(DispatchEvent::EquipmentMoved {
                    equipment: leg.equipment.clone(),
                    from,
                    to,
                    moves: leg.moves(),
                    tick: finish,
                });
            }
        }

        events.push(board.get_mut(&task.id)?.complete(finish)?);
        for id in &task.equipment {
            events.extend(registry.release_equipment(id, finish)?);
        }
        info!(task = %task.id, kind = %task.kind(), ticks = plan.duration, "task executed");

        Ok(ExecutionOutcome {
            task: task.id.clone(),
            success: true,
            reason: None,
            legs: plan.legs,
            started,
            finished: finish,
            events,
        })
    }

    /// Release whatever the task still holds and mark it Failed.  Stock and
    /// positions were never touched.
    fn abort(
        &self,
        task: &Task,
        reason: String,
        board: &mut TaskBoard,
        registry: &mut Registry,
        now: Tick,
        mut events: Vec<DispatchEvent>,
    ) -> ExecResult<ExecutionOutcome> {
        for id in &task.equipment {
            let held = registry.equipment(id).is_ok_and(|e| e.is_held_by(&task.id));
            if held {
                events.extend(registry.release_equipment(id, now)?);
            }
        }
        events.push(board.get_mut(&task.id)?.fail(reason.clone(), now)?);

        Ok(ExecutionOutcome {
            task: task.id.clone(),
            success: false,
            reason: Some(reason),
            legs: Vec::new(),
            started: now,
            finished: now,
            events,
        })
    }
}

//! The scheduling pass.
//!
//! Tasks are visited in policy order.  For each one the pass builds its
//! crew slot by slot, picking the idle, unclaimed, fitting unit with the
//! shortest route to the pickup cell (ties → lowest id).  A task is only
//! committed once every slot is filled and its stock changes apply cleanly
//! to the projected ledger; otherwise it is deferred and its tentative
//! picks go back into the pool.
//!
//! Tasks already Assigned or InProgress hold their stock claims: the
//! projected ledger starts from the registry with their changes applied.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tms_core::{EquipmentId, Position, SchedulingPolicy, TaskId, TaskStatus, Tick};
use tms_registry::{Equipment, Registry};
use tms_spatial::{Grid, Router};
use tms_task::Task;

use crate::policy::order_tasks;
use crate::requirement::{Requirement, requirements_for};

/// One task's crew, in requirement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task:           TaskId,
    pub equipment:      Vec<EquipmentId>,
    /// Longest approach route among the crew, in moves.
    pub approach_moves: u32,
}

/// A task the pass could not serve; it stays Pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferral {
    pub task:   TaskId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Run order.
    pub assignments:  Vec<Assignment>,
    pub deferred:     Vec<Deferral>,
    /// Obstacle version the approach routes were planned on.
    pub grid_version: u64,
}

impl Schedule {
    /// Assigned task ids in run order.
    pub fn order(&self) -> Vec<TaskId> {
        self.assignments.iter().map(|a| a.task.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// `registry` with the stock changes of every in-flight task in `tasks`
/// applied, in id order.  A task whose changes no longer apply is left out;
/// it will fail when executed.
pub fn projected_ledger<'a>(tasks: impl IntoIterator<Item = &'a Task>, registry: &Registry) -> Registry {
    let mut ledger = registry.clone();
    let mut in_flight: Vec<&Task> = tasks
        .into_iter()
        .filter(|t| t.status.is_in_flight())
        .collect();
    in_flight.sort_by(|a, b| a.id.cmp(&b.id));
    for task in in_flight {
        if let Err(e) = ledger.apply_stock_deltas(&task.stock_deltas(), Tick::ZERO) {
            debug!(task = %task.id, error = %e, "in-flight stock claim no longer applies");
        }
    }
    ledger
}

/// Plan assignments for every Pending task in `tasks`.
///
/// Pure with respect to its inputs: `registry` and `grid` are only read, so
/// callers may pass a snapshot and plan without holding any lock.  Pass the
/// in-flight tasks too; their stock claims are honoured.
pub fn optimize_schedule<'a, R: Router>(
    tasks: impl IntoIterator<Item = &'a Task>,
    registry: &Registry,
    grid: &Grid,
    router: &R,
    policy: SchedulingPolicy,
) -> Schedule {
    let tasks: Vec<&Task> = tasks.into_iter().collect();
    let mut pending: Vec<&Task> = tasks.iter().copied().filter(|t| t.status == TaskStatus::Pending).collect();
    order_tasks(&mut pending, policy);

    let mut schedule = Schedule { grid_version: grid.version(), ..Schedule::default() };
    let mut claimed: BTreeSet<EquipmentId> = BTreeSet::new();
    // Stock as it will be after every in-flight and newly committed task
    // has run.
    let mut ledger = projected_ledger(tasks.iter().copied(), registry);

    for task in pending {
        match plan_task(task, registry, &ledger, grid, router, &claimed) {
            Ok(assignment) => {
                // Stock was dry-run in plan_task; this cannot fail.
                if let Err(e) = ledger.apply_stock_deltas(&task.stock_deltas(), Tick::ZERO) {
                    defer(&mut schedule, task, e.to_string());
                    continue;
                }
                debug!(task = %task.id, equipment = ?assignment.equipment, "scheduled");
                claimed.extend(assignment.equipment.iter().cloned());
                schedule.assignments.push(assignment);
            }
            Err(reason) => defer(&mut schedule, task, reason),
        }
    }
    schedule
}

fn defer(schedule: &mut Schedule, task: &Task, reason: String) {
    warn!(task = %task.id, %reason, "task deferred");
    schedule.deferred.push(Deferral { task: task.id.clone(), reason });
}

/// Crew for one task, or the reason it must wait.
fn plan_task<R: Router>(
    task: &Task,
    registry: &Registry,
    ledger: &Registry,
    grid: &Grid,
    router: &R,
    claimed: &BTreeSet<EquipmentId>,
) -> Result<Assignment, String> {
    ledger.check_deltas(&task.stock_deltas()).map_err(|e| e.to_string())?;
    let requirements = requirements_for(task, registry).map_err(|e| e.to_string())?;

    let mut picked: Vec<EquipmentId> = Vec::with_capacity(requirements.len());
    let mut approach_moves = 0;
    for req in &requirements {
        let candidates: Vec<&Equipment> = registry
            .fleet()
            .filter(|e| e.is_idle() && !claimed.contains(&e.id) && !picked.contains(&e.id) && req.fits(e, registry))
            .collect();
        let Some((id, moves)) = nearest(&candidates, req, grid, router) else {
            return Err(format!("no reachable idle {} fits", req.role.as_str()));
        };
        approach_moves = approach_moves.max(moves);
        picked.push(id);
    }

    Ok(Assignment { task: task.id.clone(), equipment: picked, approach_moves })
}

/// Closest candidate by route length to the pickup cell; ties → lowest id.
/// Unreachable candidates drop out.
fn nearest<R: Router>(
    candidates: &[&Equipment],
    req: &Requirement,
    grid: &Grid,
    router: &R,
) -> Option<(EquipmentId, u32)> {
    let score = |e: &&Equipment| approach(e.position, req.pickup, grid, router).map(|m| (m, e.id.clone()));

    #[cfg(not(feature = "parallel"))]
    let scored: Vec<(u32, EquipmentId)> = candidates.iter().filter_map(score).collect();

    #[cfg(feature = "parallel")]
    let scored: Vec<(u32, EquipmentId)> = {
        use rayon::prelude::*;
        candidates.par_iter().filter_map(score).collect()
    };

    scored.into_iter().min().map(|(m, id)| (id, m))
}

fn approach<R: Router>(from: Position, to: Position, grid: &Grid, router: &R) -> Option<u32> {
    match router.route(grid, from, to) {
        Ok(route) => Some(route.moves()),
        Err(e) => {
            debug!(%from, %to, error = %e, "candidate unreachable");
            None
        }
    }
}

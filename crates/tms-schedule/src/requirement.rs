//! What equipment a task needs.
//!
//! | Task kind          | Crew                                                     |
//! |--------------------|----------------------------------------------------------|
//! | `ShipTransport`    | crane at the source + hitched truck, haul ≥ weight       |
//! | `InternalTransfer` | hitched truck, haul ≥ weight                             |
//! | `Load` / `Unload`  | crane at the warehouse, capacity ≥ weight                |
//!
//! "At a warehouse" means the crane's home is that warehouse; a crane with
//! no home is mobile and serves anywhere.  A truck only hauls with a frame
//! hitched, and its haul capacity is the smaller of the two ratings.

use tms_core::{EquipmentId, Position, TaskKind, TaskStatus, WarehouseId};
use tms_registry::{Equipment, EquipmentKind, Registry, SiteAsset};
use tms_task::{Task, TaskSpec};

use crate::error::{ScheduleError, ScheduleResult};

const CAPACITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Lifts goods at the pickup warehouse.
    Crane,
    /// Hauls goods away from the pickup warehouse.
    Hauler,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Crane  => "crane",
            Role::Hauler => "hauler",
        }
    }

    fn kind(self) -> EquipmentKind {
        match self {
            Role::Crane  => EquipmentKind::Crane,
            Role::Hauler => EquipmentKind::FrameTruck,
        }
    }
}

/// One slot of a task's crew.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub role:         Role,
    pub task_kind:    TaskKind,
    pub min_capacity: f64,
    /// Cranes must be installed here (or have no home).
    pub site:         Option<WarehouseId>,
    /// Cell the equipment travels to before work starts.
    pub pickup:       Position,
}

impl Requirement {
    /// Capability, size, and site check; status is checked separately.
    pub fn fits(&self, equipment: &Equipment, registry: &Registry) -> bool {
        self.mismatch(equipment, registry).is_none()
    }

    fn mismatch(&self, equipment: &Equipment, registry: &Registry) -> Option<ScheduleError> {
        if equipment.kind != self.role.kind() || !equipment.accepts(self.task_kind) {
            return Some(ScheduleError::Unsupported { equipment: equipment.id.clone(), kind: self.task_kind });
        }
        if let (Some(site), Some(home)) = (&self.site, &equipment.home) {
            if site != home {
                return Some(ScheduleError::Unsupported { equipment: equipment.id.clone(), kind: self.task_kind });
            }
        }
        let capacity = match self.role {
            Role::Crane  => equipment.capacity,
            Role::Hauler => match registry.haul_capacity(equipment) {
                Some(capacity) => capacity,
                None => return Some(ScheduleError::Unhitched(equipment.id.clone())),
            },
        };
        if capacity + CAPACITY_EPSILON < self.min_capacity {
            return Some(ScheduleError::Undersized {
                equipment: equipment.id.clone(),
                capacity,
                required:  self.min_capacity,
            });
        }
        None
    }
}

/// The crew `task` needs, in assignment order.
pub fn requirements_for(task: &Task, registry: &Registry) -> ScheduleResult<Vec<Requirement>> {
    let weight = registry.weight_of(&task.products)?;
    let kind = task.kind();
    let pickup_id = task.spec.pickup();
    let pickup = registry.warehouse(pickup_id)?.position;

    let crane = |min_capacity| Requirement {
        role: Role::Crane,
        task_kind: kind,
        min_capacity,
        site: Some(pickup_id.clone()),
        pickup,
    };
    let hauler = Requirement { role: Role::Hauler, task_kind: kind, min_capacity: weight, site: None, pickup };

    Ok(match &task.spec {
        TaskSpec::ShipTransport { .. }            => vec![crane(0.0), hauler],
        TaskSpec::InternalTransfer { .. }         => vec![hauler],
        TaskSpec::Load { .. } | TaskSpec::Unload { .. } => vec![crane(weight)],
    })
}

/// Check a proposed crew for `task`: every requirement covered by exactly
/// one listed unit, each unit idle and fit for its slot.  Returns the crew
/// in requirement order.
pub fn check_crew(task: &Task, crew: &[EquipmentId], registry: &Registry) -> ScheduleResult<Vec<EquipmentId>> {
    if task.status != TaskStatus::Pending {
        return Err(ScheduleError::NotPending { task: task.id.clone(), status: task.status });
    }
    for (i, id) in crew.iter().enumerate() {
        if crew[..i].contains(id) {
            return Err(ScheduleError::Repeated(id.clone()));
        }
    }

    let mut units = Vec::with_capacity(crew.len());
    for id in crew {
        let equipment = registry.equipment(id)?;
        if !equipment.accepts(task.kind()) {
            return Err(ScheduleError::Unsupported { equipment: id.clone(), kind: task.kind() });
        }
        if !equipment.is_idle() {
            return Err(ScheduleError::Unavailable { equipment: id.clone(), status: equipment.status });
        }
        units.push(equipment);
    }

    match_slots(task, &units, registry)
}

/// Re-check the crew `task` already holds against its current
/// requirements.  Capacities, homes, or hitches may have changed since the
/// crew was assigned; holding status is the caller's concern.
pub fn verify_crew(task: &Task, registry: &Registry) -> ScheduleResult<()> {
    let units = task
        .equipment
        .iter()
        .map(|id| registry.equipment(id))
        .collect::<Result<Vec<_>, _>>()?;
    match_slots(task, &units, registry).map(|_| ())
}

/// Cover every requirement with exactly one of `units`.  Returns the ids in
/// requirement order.
fn match_slots(task: &Task, units: &[&Equipment], registry: &Registry) -> ScheduleResult<Vec<EquipmentId>> {
    let mut ordered = Vec::with_capacity(units.len());
    let mut used = vec![false; units.len()];
    for req in requirements_for(task, registry)? {
        // Prefer a fitting unit; otherwise report why the first unit of the
        // right kind does not fit.
        let slot = units
            .iter()
            .enumerate()
            .find(|(i, e)| !used[*i] && req.fits(e, registry))
            .map(|(i, _)| i);
        match slot {
            Some(i) => {
                used[i] = true;
                ordered.push(units[i].id.clone());
            }
            None => {
                let near_miss = units
                    .iter()
                    .enumerate()
                    .filter(|(i, e)| !used[*i] && e.kind == req.role.kind())
                    .find_map(|(_, e)| req.mismatch(e, registry));
                return Err(near_miss.unwrap_or(ScheduleError::Incomplete {
                    task: task.id.clone(),
                    role: req.role.as_str(),
                }));
            }
        }
    }

    if let Some(i) = used.iter().position(|u| !u) {
        return Err(ScheduleError::Unsupported { equipment: units[i].id.clone(), kind: task.kind() });
    }
    Ok(ordered)
}

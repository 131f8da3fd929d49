//! Repositioning idle equipment outside any task.

use serde::{Deserialize, Serialize};
use tracing::info;

use tms_core::{DispatchClock, DispatchEvent, EquipmentId, EquipmentStatus, Position};
use tms_registry::{Registry, RegistryError};
use tms_spatial::{Grid, Route, Router};

use crate::{ExecResult, TaskExecutor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub equipment: EquipmentId,
    /// Cells travelled, both ends included.
    pub path:      Vec<Position>,
    pub events:    Vec<DispatchEvent>,
}

impl<R: Router> TaskExecutor<R> {
    /// Drive idle equipment to `target` along a planned route.
    ///
    /// The clock advances by the travel time, which is also charged to the
    /// equipment as busy time.  A truck's hitched frame moves with it;
    /// frames cannot be moved on their own.  A move to the current cell is a
    /// no-op that still returns the one-cell path.
    ///
    /// # Errors
    /// `AlreadyAssigned` unless the equipment is Idle; routing errors if
    /// `target` is invalid or unreachable.  Nothing changes on error.
    pub fn move_equipment(
        &self,
        id: &EquipmentId,
        target: Position,
        registry: &mut Registry,
        clock: &mut DispatchClock,
        grid: &Grid,
    ) -> ExecResult<MoveOutcome> {
        let equipment = registry.equipment(id)?;
        if equipment.status != EquipmentStatus::Idle {
            return Err(RegistryError::AlreadyAssigned {
                equipment: id.clone(),
                status:    equipment.status,
                task:      equipment.current_task.clone(),
            }
            .into());
        }
        let Route { cells } = self.router.route(grid, equipment.position, target)?;
        let moves = (cells.len() - 1) as u32;
        if moves == 0 {
            return Ok(MoveOutcome { equipment: id.clone(), path: cells, events: Vec::new() });
        }

        let travel = moves as u64 * self.ticks_per_move() as u64;
        let arrival = clock.now() + travel;
        let event = registry.record_move(id, target, moves, travel, arrival)?;
        clock.advance(travel);
        info!(equipment = %id, %target, moves, "equipment moved");

        Ok(MoveOutcome { equipment: id.clone(), path: cells, events: vec![event] })
    }
}

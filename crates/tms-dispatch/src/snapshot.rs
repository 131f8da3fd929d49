//! Save/restore contract for the storage collaborator.

use serde::{Deserialize, Serialize};

use tms_core::{DispatchClock, DispatchConfig};
use tms_registry::Registry;
use tms_spatial::Grid;
use tms_task::TaskBoard;

use crate::{DispatchError, DispatchResult};

/// Everything needed to rebuild a dispatcher.  Subscribers and the recent
/// event log are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config:   DispatchConfig,
    pub grid:     Grid,
    pub registry: Registry,
    pub board:    TaskBoard,
    pub clock:    DispatchClock,
}

impl Snapshot {
    /// Cross-check the parts; every restore runs this first.
    pub fn validate(&self) -> DispatchResult<()> {
        self.config.validate()?;
        if (self.grid.width(), self.grid.height()) != (self.config.grid_width, self.config.grid_height) {
            return Err(DispatchError::Snapshot(format!(
                "grid is {}x{} but config says {}x{}",
                self.grid.width(),
                self.grid.height(),
                self.config.grid_width,
                self.config.grid_height
            )));
        }
        self.registry.validate()?;
        self.board.validate()?;

        let warehouses = self.registry.warehouses().map(|w| ("warehouse", w.id.as_str(), w.position));
        let fleet = self.registry.fleet().map(|e| ("equipment", e.id.as_str(), e.position));
        for (entity, id, position) in warehouses.chain(fleet) {
            if self.grid.is_blocked(position)? {
                return Err(DispatchError::Snapshot(format!("{entity} {id} sits on blocked cell {position}")));
            }
        }

        // Every held unit points at an in-flight task that lists it.
        for equipment in self.registry.fleet() {
            let Some(task_id) = &equipment.current_task else { continue };
            let task = self.board.get(task_id)?;
            if !task.status.is_in_flight() || !task.equipment.contains(&equipment.id) {
                return Err(DispatchError::Snapshot(format!(
                    "equipment {} held by task {task_id} which is {}",
                    equipment.id, task.status
                )));
            }
        }
        // And every in-flight task holds each unit it lists.
        for task in self.board.iter().filter(|t| t.status.is_in_flight()) {
            for id in &task.equipment {
                let equipment = self.registry.equipment(id)?;
                if !equipment.is_held_by(&task.id) {
                    return Err(DispatchError::Snapshot(format!(
                        "task {} is {} but equipment {id} is {} for {}",
                        task.id,
                        task.status,
                        equipment.status,
                        equipment.current_task.as_ref().map_or("no task", |t| t.as_str())
                    )));
                }
            }
        }
        Ok(())
    }
}

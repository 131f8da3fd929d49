//! Scheduling error type.
//!
//! A pass never fails as a whole: tasks that cannot be served are deferred.
//! These errors come from checking one proposed crew.

use thiserror::Error;

use tms_core::{EquipmentId, EquipmentStatus, ErrorKind, TaskId, TaskKind, TaskStatus};
use tms_registry::RegistryError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("task {task} is {status}, not pending")]
    NotPending { task: TaskId, status: TaskStatus },

    #[error("equipment {equipment} cannot serve a {kind} task")]
    Unsupported { equipment: EquipmentId, kind: TaskKind },

    #[error("equipment {equipment} is {status}")]
    Unavailable { equipment: EquipmentId, status: EquipmentStatus },

    #[error("equipment {equipment} capacity {capacity:.3} below {required:.3}")]
    Undersized { equipment: EquipmentId, capacity: f64, required: f64 },

    #[error("truck {0} has no frame hitched")]
    Unhitched(EquipmentId),

    #[error("task {task} still needs a {role}")]
    Incomplete { task: TaskId, role: &'static str },

    #[error("equipment {0} listed twice")]
    Repeated(EquipmentId),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ScheduleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::NotPending { .. }  => ErrorKind::InvalidTransition,
            ScheduleError::Unsupported { .. } | ScheduleError::Unhitched(_) => ErrorKind::Unsupported,
            ScheduleError::Unavailable { .. } => ErrorKind::AlreadyAssigned,
            ScheduleError::Undersized { .. }  => ErrorKind::InsufficientCapacity,
            ScheduleError::Incomplete { .. } | ScheduleError::Repeated(_) => ErrorKind::Invalid,
            ScheduleError::Registry(e)        => e.kind(),
        }
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

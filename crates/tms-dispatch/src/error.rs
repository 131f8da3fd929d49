use thiserror::Error;

use tms_core::{CoreError, ErrorKind};
use tms_exec::ExecError;
use tms_registry::RegistryError;
use tms_schedule::ScheduleError;
use tms_spatial::SpatialError;
use tms_task::TaskError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("{entity} {id} is in use: {reason}")]
    InUse {
        entity: &'static str,
        id:     String,
        reason: String,
    },

    #[error("snapshot rejected: {0}")]
    Snapshot(String),
}

impl DispatchError {
    /// Coarse category for the API boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Config(e)     => e.kind(),
            DispatchError::Spatial(e)    => e.kind(),
            DispatchError::Registry(e)   => e.kind(),
            DispatchError::Task(e)       => e.kind(),
            DispatchError::Schedule(e)   => e.kind(),
            DispatchError::Exec(e)       => e.kind(),
            DispatchError::InUse { .. }  => ErrorKind::InUse,
            DispatchError::Snapshot(_)   => ErrorKind::Invalid,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

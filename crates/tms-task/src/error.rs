//! Task error type.

use thiserror::Error;

use tms_core::{ErrorKind, TaskId, TaskStatus};
use tms_registry::RegistryError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task id {0} already exists")]
    DuplicateId(TaskId),

    #[error("task {task} cannot {action} while {from}")]
    InvalidTransition {
        task:   TaskId,
        from:   TaskStatus,
        action: &'static str,
    },

    #[error("task {task} is {status} and cannot be removed")]
    InFlight { task: TaskId, status: TaskStatus },

    #[error("{0} cannot take part in this task")]
    Unsupported(String),

    #[error("no finished-goods warehouse holds the requested products")]
    NoShipSource,

    #[error("invalid task: {0}")]
    Invalid(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::NotFound(_) | TaskError::NoShipSource => ErrorKind::NotFound,
            TaskError::DuplicateId(_)                         => ErrorKind::DuplicateId,
            TaskError::InvalidTransition { .. }               => ErrorKind::InvalidTransition,
            TaskError::InFlight { .. }                        => ErrorKind::InUse,
            TaskError::Unsupported(_)                         => ErrorKind::Unsupported,
            TaskError::Invalid(_)                             => ErrorKind::Invalid,
            TaskError::Registry(e)                            => e.kind(),
        }
    }
}

pub type TaskResult<T> = Result<T, TaskError>;

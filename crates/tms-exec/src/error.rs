use thiserror::Error;

use tms_core::ErrorKind;
use tms_registry::RegistryError;
use tms_spatial::SpatialError;
use tms_task::TaskError;

/// Errors that stop an operation before it changes anything.  Failures
/// during execution are reported in the outcome instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("routing failed: {0}")]
    Routing(#[from] SpatialError),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Task(e)     => e.kind(),
            ExecError::Registry(e) => e.kind(),
            ExecError::Routing(e)  => e.kind(),
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;

//! Registry error type.

use thiserror::Error;

use tms_core::{EquipmentId, EquipmentStatus, ErrorKind, ProductId, TaskId, WarehouseId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("warehouse {0} not found")]
    WarehouseNotFound(WarehouseId),

    #[error("equipment {0} not found")]
    EquipmentNotFound(EquipmentId),

    #[error("{entity} id {id} already exists")]
    DuplicateId { entity: &'static str, id: String },

    #[error("warehouse {warehouse} over capacity: {required:.3} needed, {capacity:.3} available")]
    InsufficientCapacity {
        warehouse: WarehouseId,
        required:  f64,
        capacity:  f64,
    },

    #[error("warehouse {warehouse} holds {have} of {product}; cannot apply {delta}")]
    NegativeStock {
        warehouse: WarehouseId,
        product:   ProductId,
        have:      u64,
        delta:     i64,
    },

    #[error("equipment {equipment} is {status}, not idle")]
    AlreadyAssigned {
        equipment: EquipmentId,
        status:    EquipmentStatus,
        task:      Option<TaskId>,
    },

    #[error("equipment {equipment} is not held by task {task}")]
    NotHeldBy { equipment: EquipmentId, task: TaskId },

    #[error("{entity} {id} is in use: {reason}")]
    InUse {
        entity: &'static str,
        id:     String,
        reason: String,
    },

    #[error("invalid {entity}: {reason}")]
    Invalid { entity: &'static str, reason: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::ProductNotFound(_)
            | RegistryError::WarehouseNotFound(_)
            | RegistryError::EquipmentNotFound(_) => ErrorKind::NotFound,
            RegistryError::DuplicateId { .. }          => ErrorKind::DuplicateId,
            RegistryError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            RegistryError::NegativeStock { .. }        => ErrorKind::NegativeStock,
            RegistryError::AlreadyAssigned { .. }      => ErrorKind::AlreadyAssigned,
            RegistryError::NotHeldBy { .. }            => ErrorKind::InvalidTransition,
            RegistryError::InUse { .. }                => ErrorKind::InUse,
            RegistryError::Invalid { .. }              => ErrorKind::Invalid,
        }
    }

    pub(crate) fn invalid(entity: &'static str, reason: impl Into<String>) -> Self {
        RegistryError::Invalid { entity, reason: reason.into() }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

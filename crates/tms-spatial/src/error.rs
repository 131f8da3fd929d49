//! Spatial-subsystem error type.

use thiserror::Error;

use tms_core::{ErrorKind, Position};

/// Errors produced by `tms-spatial`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialError {
    #[error("position {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        position: Position,
        width:    u32,
        height:   u32,
    },

    #[error("invalid route endpoint {position}: {reason}")]
    InvalidPosition {
        position: Position,
        reason:   &'static str,
    },

    #[error("no path from {from} to {to}")]
    NoPathFound { from: Position, to: Position },

    #[error("malformed grid data: {0}")]
    Malformed(String),
}

impl SpatialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpatialError::OutOfBounds { .. }     => ErrorKind::OutOfBounds,
            SpatialError::InvalidPosition { .. } => ErrorKind::InvalidPosition,
            SpatialError::NoPathFound { .. }     => ErrorKind::NoPathFound,
            SpatialError::Malformed(_)           => ErrorKind::Invalid,
        }
    }
}

pub type SpatialResult<T> = Result<T, SpatialError>;

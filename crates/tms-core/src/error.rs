//! Error classification shared by every `tms-*` crate.
//!
//! Each crate keeps its own `thiserror` enum.  All of them expose
//! `kind() -> ErrorKind` so the API boundary can map a failure to a
//! user-facing status without matching every variant of every crate.

use thiserror::Error;

/// The failure categories of the dispatch engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An unknown id was referenced.
    NotFound,
    DuplicateId,
    /// A position outside the grid.
    OutOfBounds,
    /// A route endpoint that is blocked (or out of bounds).
    InvalidPosition,
    NoPathFound,
    InsufficientCapacity,
    NegativeStock,
    /// Equipment is not Idle.
    AlreadyAssigned,
    /// A task lifecycle violation.
    InvalidTransition,
    /// Equipment cannot perform the requested task kind.
    Unsupported,
    /// Removal blocked by an in-flight reference.
    InUse,
    /// Input failed validation.
    Invalid,
    Config,
    /// Writing an output file or database failed.
    Output,
}

/// Errors raised by `tms-core` itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

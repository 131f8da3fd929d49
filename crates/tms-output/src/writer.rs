//! The `OutputWriter` trait implemented by all backend writers.

use crate::{EventRow, OutputResult, TaskRow};

/// Trait implemented by the CSV and SQLite writers.
///
/// [`EventRecorder`][crate::EventRecorder] stores the first error instead
/// of propagating it; read it back with `take_error`.
pub trait OutputWriter {
    /// Append a batch of events.
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()>;

    /// Append a batch of task records.
    fn write_tasks(&mut self, rows: &[TaskRow]) -> OutputResult<()>;

    /// Flush and close all underlying handles.  Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}

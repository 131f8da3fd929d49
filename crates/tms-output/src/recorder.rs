//! `EventRecorder<W>` — drains a dispatcher event channel into an
//! `OutputWriter`.

use crossbeam::channel::Receiver;
use tracing::{debug, warn};

use tms_core::{DispatchConfig, DispatchEvent};
use tms_task::Task;

use crate::row::{EventRow, TaskRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// Writes every event received on `events` to any [`OutputWriter`].
///
/// The recorder never blocks: [`drain`][Self::drain] takes what is queued
/// and returns.  Write errors are stored, not returned; check
/// [`take_error`][Self::take_error] when done.
pub struct EventRecorder<W: OutputWriter> {
    writer:             W,
    events:             Receiver<DispatchEvent>,
    start_unix_secs:    i64,
    tick_duration_secs: u32,
    next_seq:           u64,
    last_error:         Option<OutputError>,
}

impl<W: OutputWriter> EventRecorder<W> {
    /// `config` supplies the tick → wall-time conversion.
    pub fn new(writer: W, events: Receiver<DispatchEvent>, config: &DispatchConfig) -> Self {
        Self {
            writer,
            events,
            start_unix_secs:    config.start_unix_secs,
            tick_duration_secs: config.tick_duration_secs,
            next_seq:           0,
            last_error:         None,
        }
    }

    /// Write every queued event.  Returns how many were taken off the
    /// channel (written or not).
    pub fn drain(&mut self) -> usize {
        let rows: Vec<EventRow> = self
            .events
            .try_iter()
            .enumerate()
            .map(|(i, e)| EventRow::from_event(self.next_seq + i as u64, &e, self.start_unix_secs, self.tick_duration_secs))
            .collect();
        if rows.is_empty() {
            return 0;
        }
        self.next_seq += rows.len() as u64;
        debug!(events = rows.len(), "recording events");
        let result = self.writer.write_events(&rows);
        self.store_err(result);
        rows.len()
    }

    /// Write the current state of `tasks`.
    pub fn write_tasks(&mut self, tasks: &[Task]) {
        let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from).collect();
        let result = self.writer.write_tasks(&rows);
        self.store_err(result);
    }

    /// Drain what is left, then flush and close the writer.
    pub fn finish(&mut self) {
        self.drain();
        let result = self.writer.finish();
        self.store_err(result);
    }

    /// Events taken off the channel so far.
    pub fn recorded(&self) -> u64 {
        self.next_seq
    }

    /// Take the stored write error, if any.  Only the first is kept.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            warn!(error = %e, "output write failed");
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

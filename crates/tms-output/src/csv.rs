//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `events.csv`
//! - `tasks.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{EventRow, OutputResult, TaskRow};

pub const EVENT_HEADERS: [&str; 6] = ["seq", "tick", "unix_time_secs", "event", "subject", "detail"];

pub const TASK_HEADERS: [&str; 11] = [
    "task_id",
    "kind",
    "status",
    "priority",
    "deadline",
    "created",
    "started",
    "finished",
    "equipment",
    "products",
    "failure_reason",
];

/// Writes dispatch output to two CSV files.
pub struct CsvWriter {
    events:   Writer<File>,
    tasks:    Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Create the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut events = Writer::from_path(dir.join("events.csv"))?;
        events.write_record(EVENT_HEADERS)?;

        let mut tasks = Writer::from_path(dir.join("tasks.csv"))?;
        tasks.write_record(TASK_HEADERS)?;

        Ok(Self { events, tasks, finished: false })
    }
}

/// Empty cell for `None`.
fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl OutputWriter for CsvWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.seq.to_string(),
                opt(row.tick),
                opt(row.unix_time_secs),
                row.event.to_string(),
                row.subject.clone(),
                row.detail.clone(),
            ])?;
        }
        Ok(())
    }

    fn write_tasks(&mut self, rows: &[TaskRow]) -> OutputResult<()> {
        for row in rows {
            self.tasks.write_record(&[
                row.task_id.clone(),
                row.kind.to_string(),
                row.status.to_string(),
                row.priority.to_string(),
                opt(row.deadline),
                row.created.to_string(),
                opt(row.started),
                opt(row.finished),
                row.equipment.clone(),
                row.products.clone(),
                row.failure_reason.clone(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.tasks.flush()?;
        Ok(())
    }
}

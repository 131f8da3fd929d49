//! `tms-output` — writes dispatch events and task records to disk.
//!
//! Two backends are provided behind Cargo features:
//!
//! | Feature   | Backend | Files created              |
//! |-----------|---------|----------------------------|
//! | *(none)*  | CSV     | `events.csv`, `tasks.csv`  |
//! | `sqlite`  | SQLite  | `output.db`                |
//!
//! All backends implement [`OutputWriter`] and are fed by
//! [`EventRecorder`], which drains a dispatcher event channel.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tms_output::{CsvWriter, EventRecorder};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut recorder = EventRecorder::new(writer, dispatcher.subscribe(), dispatcher.config());
//! // ... drive the dispatcher ...
//! recorder.drain();
//! recorder.write_tasks(&dispatcher.tasks());
//! recorder.finish();
//! if let Some(e) = recorder.take_error() { eprintln!("output error: {e}"); }
//! ```

pub mod csv;
pub mod error;
pub mod recorder;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use recorder::EventRecorder;
pub use row::{EventRow, TaskRow};
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;

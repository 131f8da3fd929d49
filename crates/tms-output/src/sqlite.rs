//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! two tables: `events` and `tasks`.  Task rows are upserts, so writing the
//! task list again after more work replaces the earlier records.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::OutputWriter;
use crate::{EventRow, OutputResult, TaskRow};

/// Writes dispatch output to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS events (
                 seq            INTEGER NOT NULL,
                 tick           INTEGER,
                 unix_time_secs INTEGER,
                 event          TEXT    NOT NULL,
                 subject        TEXT    NOT NULL,
                 detail         TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tasks (
                 task_id        TEXT    PRIMARY KEY,
                 kind           TEXT    NOT NULL,
                 status         TEXT    NOT NULL,
                 priority       INTEGER NOT NULL,
                 deadline       INTEGER,
                 created        INTEGER NOT NULL,
                 started        INTEGER,
                 finished       INTEGER,
                 equipment      TEXT    NOT NULL,
                 products       TEXT    NOT NULL,
                 failure_reason TEXT    NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO events (seq, tick, unix_time_secs, event, subject, detail) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.seq as i64,
                    row.tick.map(|t| t as i64),
                    row.unix_time_secs,
                    row.event,
                    row.subject,
                    row.detail,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_tasks(&mut self, rows: &[TaskRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO tasks \
                 (task_id, kind, status, priority, deadline, created, started, finished, \
                  equipment, products, failure_reason) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.task_id,
                    row.kind,
                    row.status,
                    row.priority,
                    row.deadline.map(|t| t as i64),
                    row.created as i64,
                    row.started.map(|t| t as i64),
                    row.finished.map(|t| t as i64),
                    row.equipment,
                    row.products,
                    row.failure_reason,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

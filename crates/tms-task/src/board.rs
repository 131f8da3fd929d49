//! `TaskBoard` — every task, keyed by id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use tms_core::{DispatchEvent, TaskId, TaskStatus, Tick};

use crate::error::{TaskError, TaskResult};
use crate::task::{Task, TaskDraft};

/// Number of tasks in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending:     usize,
    pub assigned:    usize,
    pub in_progress: usize,
    pub completed:   usize,
    pub failed:      usize,
    pub cancelled:   usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.assigned + self.in_progress + self.completed + self.failed + self.cancelled
    }

    fn bump(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending    => self.pending += 1,
            TaskStatus::Assigned   => self.assigned += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed  => self.completed += 1,
            TaskStatus::Failed     => self.failed += 1,
            TaskStatus::Cancelled  => self.cancelled += 1,
        }
    }
}

/// Owns every task.  Ids are generated from a creation counter
/// (`T000001`, `T000002`, …).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBoard {
    tasks:    BTreeMap<TaskId, Task>,
    next_seq: u64,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a validated draft as a new Pending task.
    pub fn create(&mut self, draft: TaskDraft, tick: Tick) -> TaskResult<(TaskId, DispatchEvent)> {
        let seq = self.next_seq + 1;
        let id = TaskId::from_seq(seq);
        if self.tasks.contains_key(&id) {
            return Err(TaskError::DuplicateId(id));
        }
        let task = Task::from_draft(id.clone(), seq, draft, tick);
        let event = DispatchEvent::TaskCreated {
            task:     id.clone(),
            kind:     task.kind(),
            priority: task.priority,
            tick,
        };
        info!(task = %id, kind = %task.kind(), priority = task.priority, "task created");
        self.tasks.insert(id.clone(), task);
        self.next_seq = seq;
        Ok((id, event))
    }

    pub fn get(&self, id: &TaskId) -> TaskResult<&Task> {
        self.tasks.get(id).ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &TaskId) -> TaskResult<&mut Task> {
        self.tasks.get_mut(id).ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    /// All tasks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn with_status(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(move |t| t.status == status)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for task in self.tasks.values() {
            counts.bump(task.status);
        }
        counts
    }

    /// Remove a task that holds no equipment (anything but Assigned or
    /// InProgress).
    pub fn remove(&mut self, id: &TaskId) -> TaskResult<Task> {
        let task = self.get(id)?;
        if task.status.is_in_flight() {
            return Err(TaskError::InFlight { task: id.clone(), status: task.status });
        }
        self.tasks.remove(id).ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    /// Re-check board invariants; used after deserializing a snapshot.
    pub fn validate(&self) -> TaskResult<()> {
        for (id, task) in &self.tasks {
            if id != &task.id {
                return Err(TaskError::Invalid(format!("task keyed as {id} has id {}", task.id)));
            }
            if task.seq > self.next_seq {
                return Err(TaskError::Invalid(format!(
                    "task {id} has seq {} beyond counter {}",
                    task.seq, self.next_seq
                )));
            }
        }
        Ok(())
    }
}

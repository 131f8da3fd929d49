//! `Task` and its state machine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tms_core::{DispatchEvent, EquipmentId, ProductId, TaskId, TaskKind, TaskStatus, Tick};
use tms_registry::StockDelta;

use crate::error::{TaskError, TaskResult};
use crate::spec::TaskSpec;

/// Default priority when the caller gives none.
pub const DEFAULT_PRIORITY: i32 = 1;

/// A task before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub spec:     TaskSpec,
    pub products: BTreeMap<ProductId, u64>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub deadline: Option<Tick>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl TaskDraft {
    pub fn new(spec: TaskSpec) -> Self {
        Self { spec, products: BTreeMap::new(), priority: DEFAULT_PRIORITY, deadline: None }
    }

    /// Add `quantity` of `product`; repeated products accumulate.
    pub fn with_product(mut self, product: impl Into<ProductId>, quantity: u64) -> Self {
        *self.products.entry(product.into()).or_default() += quantity;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: Tick) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id:             TaskId,
    pub spec:           TaskSpec,
    /// Higher is more urgent.
    pub priority:       i32,
    pub deadline:       Option<Tick>,
    pub products:       BTreeMap<ProductId, u64>,
    pub status:         TaskStatus,
    /// Equipment the task holds (or held, once terminal).
    pub equipment:      Vec<EquipmentId>,
    /// Creation order; the final ordering tie-break.
    pub seq:            u64,
    pub created:        Tick,
    pub started:        Option<Tick>,
    pub finished:       Option<Tick>,
    pub failure_reason: Option<String>,
}

impl Task {
    pub(crate) fn from_draft(id: TaskId, seq: u64, draft: TaskDraft, created: Tick) -> Self {
        Self {
            id,
            spec: draft.spec,
            priority: draft.priority,
            deadline: draft.deadline,
            products: draft.products,
            status: TaskStatus::Pending,
            equipment: Vec::new(),
            seq,
            created,
            started: None,
            finished: None,
            failure_reason: None,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.spec.kind()
    }

    /// Ticks from start to finish, once both are known.
    pub fn execution_ticks(&self) -> Option<u64> {
        Some(self.finished?.since(self.started?))
    }

    /// Stock changes that completing this task applies, source lines first.
    pub fn stock_deltas(&self) -> Vec<StockDelta> {
        let mut out = Vec::with_capacity(self.products.len() * 2);
        if let Some(source) = self.spec.source() {
            for (product, quantity) in &self.products {
                out.push(StockDelta::new(source.clone(), product.clone(), -(*quantity as i64)));
            }
        }
        if let Some(target) = self.spec.target() {
            for (product, quantity) in &self.products {
                out.push(StockDelta::new(target.clone(), product.clone(), *quantity as i64));
            }
        }
        out
    }

    fn refuse(&self, action: &'static str) -> TaskError {
        TaskError::InvalidTransition { task: self.id.clone(), from: self.status, action }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Pending → Assigned with the given equipment.
    pub fn assign(&mut self, equipment: Vec<EquipmentId>, tick: Tick) -> TaskResult<DispatchEvent> {
        if self.status != TaskStatus::Pending {
            return Err(self.refuse("be assigned"));
        }
        if equipment.is_empty() {
            return Err(TaskError::Invalid(format!("{}: assignment without equipment", self.id)));
        }
        info!(task = %self.id, equipment = ?equipment, "task assigned");
        self.status = TaskStatus::Assigned;
        self.equipment = equipment.clone();
        Ok(DispatchEvent::TaskAssigned { task: self.id.clone(), equipment, tick })
    }

    /// Assigned → InProgress.
    pub fn begin(&mut self, tick: Tick) -> TaskResult<DispatchEvent> {
        if self.status != TaskStatus::Assigned {
            return Err(self.refuse("begin"));
        }
        self.status = TaskStatus::InProgress;
        self.started = Some(tick);
        Ok(DispatchEvent::TaskStarted { task: self.id.clone(), tick })
    }

    /// InProgress → Completed.
    pub fn complete(&mut self, tick: Tick) -> TaskResult<DispatchEvent> {
        if self.status != TaskStatus::InProgress {
            return Err(self.refuse("complete"));
        }
        info!(task = %self.id, %tick, "task completed");
        self.status = TaskStatus::Completed;
        self.finished = Some(tick);
        Ok(DispatchEvent::TaskCompleted { task: self.id.clone(), tick })
    }

    /// InProgress → Failed, recording `reason`.
    pub fn fail(&mut self, reason: impl Into<String>, tick: Tick) -> TaskResult<DispatchEvent> {
        if self.status != TaskStatus::InProgress {
            return Err(self.refuse("fail"));
        }
        let reason = reason.into();
        warn!(task = %self.id, %reason, "task failed");
        self.status = TaskStatus::Failed;
        self.finished = Some(tick);
        self.failure_reason = Some(reason.clone());
        Ok(DispatchEvent::TaskFailed { task: self.id.clone(), reason, tick })
    }

    /// Pending/Assigned → Cancelled.  The equipment list is kept as history;
    /// releasing it is the caller's job.
    pub fn cancel(&mut self, tick: Tick) -> TaskResult<DispatchEvent> {
        if !matches!(self.status, TaskStatus::Pending | TaskStatus::Assigned) {
            return Err(self.refuse("be cancelled"));
        }
        info!(task = %self.id, "task cancelled");
        self.status = TaskStatus::Cancelled;
        self.finished = Some(tick);
        Ok(DispatchEvent::TaskCancelled { task: self.id.clone(), tick })
    }
}

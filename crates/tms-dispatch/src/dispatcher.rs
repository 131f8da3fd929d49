//! The `Dispatcher` context.
//!
//! # Locking
//!
//! Registry, task board, clock and event log sit behind one `Mutex`; the
//! grid behind an `RwLock`.  When both are needed the state lock is taken
//! first.  Route queries hold the grid read lock for the whole search.
//!
//! `optimize_schedule` is the one operation that plans without a lock: it
//! clones what it needs, releases both locks, plans, then re-takes the
//! state lock and re-checks every assignment before reserving anything.

use std::collections::BTreeMap;

use crossbeam::channel::Receiver;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tms_core::{
    DispatchClock, DispatchConfig, DispatchEvent, EquipmentId, Position, ProductId, TaskId, TaskStatus,
    Tick, WarehouseId,
};
use tms_exec::{ExecutionOutcome, Site, TaskExecutor};
use tms_registry::{
    Equipment, EquipmentUpdate, Product, ProductUpdate, Registry, Warehouse, WarehouseUpdate,
};
use tms_schedule::{check_crew, projected_ledger};
use tms_spatial::{AStarRouter, Grid, Route, Router, SpatialError};
use tms_task::{ShipPlan, Task, TaskBoard, TaskDraft, TaskSpec, resolve_ship_source, validate_draft};

use crate::log::EventLog;
use crate::report::{self, PerformanceReport, REPORT_RECENT_EVENTS, SystemStatus};
use crate::routing::SiteRouter;
use crate::{DispatchError, DispatchResult, DispatcherBuilder, Snapshot};

pub(crate) struct State {
    pub(crate) registry: Registry,
    pub(crate) board:    TaskBoard,
    pub(crate) clock:    DispatchClock,
    pub(crate) log:      EventLog,
}

/// A ship transport request.  Without `source` the lowest-id finished-goods
/// warehouse holding every product is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOrder {
    pub plan:     ShipPlan,
    pub products: BTreeMap<ProductId, u64>,
    pub priority: i32,
    pub deadline: Option<Tick>,
    pub source:   Option<WarehouseId>,
}

impl ShipOrder {
    pub fn new(plan: ShipPlan) -> Self {
        Self {
            plan,
            products: BTreeMap::new(),
            priority: tms_task::task::DEFAULT_PRIORITY,
            deadline: None,
            source: None,
        }
    }

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

    pub fn from_source(mut self, source: impl Into<WarehouseId>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Owns the whole site: entities, tasks, grid, clock and event log.
///
/// Every method takes `&self`; a `Dispatcher` can be shared across threads
/// behind an `Arc`.
pub struct Dispatcher<R: Router = AStarRouter> {
    pub(crate) config:   DispatchConfig,
    pub(crate) state:    Mutex<State>,
    pub(crate) grid:     RwLock<Grid>,
    pub(crate) executor: TaskExecutor<SiteRouter<R>>,
}

impl Dispatcher<AStarRouter> {
    /// Empty site with the default planner.
    pub fn new(config: DispatchConfig) -> DispatchResult<Self> {
        DispatcherBuilder::new(config).build()
    }
}

/// Reject cells an entity cannot stand on.
fn check_cell(grid: &Grid, position: Position) -> DispatchResult<()> {
    if grid.is_blocked(position)? {
        return Err(SpatialError::InvalidPosition { position, reason: "cell is blocked" }.into());
    }
    Ok(())
}

/// Reserve `crew` for `task` and mark it Assigned.  All or nothing.
fn assign_crew(
    registry: &mut Registry,
    board: &mut TaskBoard,
    task: &TaskId,
    crew: Vec<EquipmentId>,
    now: Tick,
) -> DispatchResult<Vec<DispatchEvent>> {
    let mut events = Vec::with_capacity(crew.len() + 1);
    for (i, id) in crew.iter().enumerate() {
        match registry.reserve_equipment(id, task, now) {
            Ok(event) => events.push(event),
            Err(e) => {
                release_all(registry, &crew[..i], now)?;
                return Err(e.into());
            }
        }
    }
    match board.get_mut(task).and_then(|t| t.assign(crew.clone(), now)) {
        Ok(event) => {
            events.push(event);
            Ok(events)
        }
        Err(e) => {
            release_all(registry, &crew, now)?;
            Err(e.into())
        }
    }
}

fn release_all(registry: &mut Registry, crew: &[EquipmentId], now: Tick) -> DispatchResult<()> {
    for id in crew {
        registry.release_equipment(id, now)?;
    }
    Ok(())
}

impl<R: Router> Dispatcher<R> {
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn now(&self) -> Tick {
        self.state.lock().clock.now()
    }

    /// The tick `hours` from now, for deadlines.
    pub fn deadline_in_hours(&self, hours: u64) -> Tick {
        self.state.lock().clock.deadline_in_hours(hours)
    }

    /// `(hits, misses)` of the route cache, if enabled.
    pub fn route_cache_stats(&self) -> Option<(u64, u64)> {
        self.executor.router.cache_stats()
    }

    // ── Products ──────────────────────────────────────────────────────────

    pub fn add_product(&self, product: Product) -> DispatchResult<()> {
        Ok(self.state.lock().registry.add_product(product)?)
    }

    pub fn product(&self, id: &ProductId) -> DispatchResult<Product> {
        Ok(self.state.lock().registry.product(id)?.clone())
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.lock().registry.products().cloned().collect()
    }

    pub fn update_product(&self, id: &ProductId, update: &ProductUpdate) -> DispatchResult<Product> {
        Ok(self.state.lock().registry.update_product(id, update)?.clone())
    }

    /// Fails `InUse` while stocked or named by a live task.
    pub fn remove_product(&self, id: &ProductId) -> DispatchResult<Product> {
        let mut guard = self.state.lock();
        let State { registry, board, .. } = &mut *guard;
        if let Some(task) = board.iter().find(|t| !t.status.is_terminal() && t.products.contains_key(id)) {
            return Err(DispatchError::InUse {
                entity: "product",
                id:     id.to_string(),
                reason: format!("listed by {} task {}", task.status, task.id),
            });
        }
        let product = registry.remove_product(id)?;
        info!(product = %id, "product removed");
        Ok(product)
    }

    // ── Warehouses ────────────────────────────────────────────────────────

    pub fn add_warehouse(&self, warehouse: Warehouse) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        check_cell(&self.grid.read(), warehouse.position)?;
        Ok(guard.registry.add_warehouse(warehouse)?)
    }

    pub fn warehouse(&self, id: &WarehouseId) -> DispatchResult<Warehouse> {
        Ok(self.state.lock().registry.warehouse(id)?.clone())
    }

    pub fn warehouses(&self) -> Vec<Warehouse> {
        self.state.lock().registry.warehouses().cloned().collect()
    }

    pub fn update_warehouse(&self, id: &WarehouseId, update: &WarehouseUpdate) -> DispatchResult<Warehouse> {
        let mut guard = self.state.lock();
        if let Some(position) = update.position {
            check_cell(&self.grid.read(), position)?;
        }
        Ok(guard.registry.update_warehouse(id, update)?.clone())
    }

    /// Fails `InUse` while the warehouse holds stock, is a crane's home, or
    /// is referenced by a live task.
    pub fn remove_warehouse(&self, id: &WarehouseId) -> DispatchResult<Warehouse> {
        let mut guard = self.state.lock();
        let State { registry, board, .. } = &mut *guard;
        if let Some(task) = board.iter().find(|t| !t.status.is_terminal() && t.spec.warehouses().any(|w| w == id)) {
            return Err(DispatchError::InUse {
                entity: "warehouse",
                id:     id.to_string(),
                reason: format!("referenced by {} task {}", task.status, task.id),
            });
        }
        let warehouse = registry.remove_warehouse(id)?;
        info!(warehouse = %id, "warehouse removed");
        Ok(warehouse)
    }

    /// Add `delta` of `product` to `warehouse`; returns the new quantity.
    /// Stock is unchanged on error.
    pub fn adjust_stock(&self, warehouse: &WarehouseId, product: &ProductId, delta: i64) -> DispatchResult<u64> {
        let mut guard = self.state.lock();
        let State { registry, clock, log, .. } = &mut *guard;
        let event = registry.adjust_stock(warehouse, product, delta, clock.now())?;
        log.push(event);
        Ok(registry.warehouse(warehouse)?.quantity(product))
    }

    // ── Equipment ─────────────────────────────────────────────────────────

    pub fn add_equipment(&self, equipment: Equipment) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        check_cell(&self.grid.read(), equipment.position)?;
        Ok(guard.registry.add_equipment(equipment)?)
    }

    pub fn equipment(&self, id: &EquipmentId) -> DispatchResult<Equipment> {
        Ok(self.state.lock().registry.equipment(id)?.clone())
    }

    pub fn fleet(&self) -> Vec<Equipment> {
        self.state.lock().registry.fleet().cloned().collect()
    }

    pub fn update_equipment(&self, id: &EquipmentId, update: &EquipmentUpdate) -> DispatchResult<Equipment> {
        Ok(self.state.lock().registry.update_equipment(id, update)?.clone())
    }

    pub fn remove_equipment(&self, id: &EquipmentId) -> DispatchResult<Equipment> {
        let equipment = self.state.lock().registry.remove_equipment(id)?;
        info!(equipment = %id, "equipment removed");
        Ok(equipment)
    }

    pub fn set_out_of_service(&self, id: &EquipmentId) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        let State { registry, clock, log, .. } = &mut *guard;
        let event = registry.set_out_of_service(id, clock.now())?;
        info!(equipment = %id, "equipment out of service");
        log.push(event);
        Ok(())
    }

    pub fn return_to_service(&self, id: &EquipmentId) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        let State { registry, clock, log, .. } = &mut *guard;
        let event = registry.return_to_service(id, clock.now())?;
        info!(equipment = %id, "equipment back in service");
        log.push(event);
        Ok(())
    }

    /// Hitch idle `frame` to idle `truck`; the frame must be on or next to
    /// the truck's cell.
    pub fn attach_frame(&self, truck: &EquipmentId, frame: &EquipmentId) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        let State { registry, clock, log, .. } = &mut *guard;
        log.push(registry.attach_frame(truck, frame, clock.now())?);
        Ok(())
    }

    pub fn detach_frame(&self, truck: &EquipmentId) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        let State { registry, clock, log, .. } = &mut *guard;
        log.push(registry.detach_frame(truck, clock.now())?);
        Ok(())
    }

    /// Drive idle equipment to `target`; returns the cells travelled.
    pub fn move_equipment(&self, id: &EquipmentId, target: Position) -> DispatchResult<Vec<Position>> {
        let mut guard = self.state.lock();
        let State { registry, clock, log, .. } = &mut *guard;
        let grid = self.grid.read();
        let outcome = self.executor.move_equipment(id, target, registry, clock, &grid)?;
        log.extend(outcome.events);
        Ok(outcome.path)
    }

    // ── Tasks ─────────────────────────────────────────────────────────────

    /// Validate `draft` against the registry and add it as Pending.
    pub fn create_task(&self, draft: TaskDraft) -> DispatchResult<TaskId> {
        let mut guard = self.state.lock();
        Self::create_locked(&mut guard, draft)
    }

    fn create_locked(state: &mut State, draft: TaskDraft) -> DispatchResult<TaskId> {
        validate_draft(&draft, &state.registry)?;
        let (id, event) = state.board.create(draft, state.clock.now())?;
        state.log.push(event);
        Ok(id)
    }

    pub fn create_ship_transport(&self, order: ShipOrder) -> DispatchResult<TaskId> {
        let mut guard = self.state.lock();
        if let Some(berth) = order.plan.berth {
            check_cell(&self.grid.read(), berth)?;
        }
        let ShipOrder { plan, products, priority, deadline, source } = order;
        let source = match source {
            Some(source) => source,
            None => {
                let source = resolve_ship_source(&guard.registry, products.iter())?;
                debug!(%source, "ship source resolved");
                source
            }
        };
        let draft = TaskDraft { spec: TaskSpec::ShipTransport { plan, source }, products, priority, deadline };
        Self::create_locked(&mut guard, draft)
    }

    pub fn create_internal_transfer(
        &self,
        source: impl Into<WarehouseId>,
        target: impl Into<WarehouseId>,
        products: impl IntoIterator<Item = (ProductId, u64)>,
        priority: i32,
    ) -> DispatchResult<TaskId> {
        let spec = TaskSpec::InternalTransfer { source: source.into(), target: target.into() };
        self.create_task(draft_of(spec, products, priority))
    }

    pub fn create_load(
        &self,
        warehouse: impl Into<WarehouseId>,
        products: impl IntoIterator<Item = (ProductId, u64)>,
        priority: i32,
    ) -> DispatchResult<TaskId> {
        let spec = TaskSpec::Load { warehouse: warehouse.into() };
        self.create_task(draft_of(spec, products, priority))
    }

    pub fn create_unload(
        &self,
        warehouse: impl Into<WarehouseId>,
        products: impl IntoIterator<Item = (ProductId, u64)>,
        priority: i32,
    ) -> DispatchResult<TaskId> {
        let spec = TaskSpec::Unload { warehouse: warehouse.into() };
        self.create_task(draft_of(spec, products, priority))
    }

    pub fn task(&self, id: &TaskId) -> DispatchResult<Task> {
        Ok(self.state.lock().board.get(id)?.clone())
    }

    /// Every task in id order.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().board.iter().cloned().collect()
    }

    pub fn tasks_with_status(&self, status: TaskStatus) -> Vec<Task> {
        self.state.lock().board.with_status(status).cloned().collect()
    }

    /// Drop a task that holds no equipment.
    pub fn remove_task(&self, id: &TaskId) -> DispatchResult<Task> {
        Ok(self.state.lock().board.remove(id)?)
    }

    /// Manually give Pending task `id` the listed crew.  The crew must cover
    /// the task's requirements exactly, under the same rules the scheduler
    /// follows.
    pub fn assign_equipment(&self, id: &TaskId, equipment: &[EquipmentId]) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        let State { registry, board, clock, log } = &mut *guard;
        let crew = check_crew(board.get(id)?, equipment, registry)?;
        let events = assign_crew(registry, board, id, crew, clock.now())?;
        log.extend(events);
        Ok(())
    }

    /// Pending or Assigned → Cancelled, releasing any held equipment.
    pub fn cancel_task(&self, id: &TaskId) -> DispatchResult<()> {
        let mut guard = self.state.lock();
        let State { registry, board, clock, log } = &mut *guard;
        let now = clock.now();
        let task = board.get_mut(id)?;
        let event = task.cancel(now)?;
        let crew = task.equipment.clone();
        log.push(event);
        for equipment in &crew {
            if registry.equipment(equipment)?.is_held_by(id) {
                if let Some(event) = registry.release_equipment(equipment, now)? {
                    log.push(event);
                }
            }
        }
        Ok(())
    }

    /// Run Assigned task `id`.  `Ok(false)` means it ran and failed; the
    /// reason is on the task.
    pub fn execute(&self, id: &TaskId) -> DispatchResult<bool> {
        Ok(self.execute_detailed(id)?.success)
    }

    /// [`execute`][Self::execute] returning the legs and events as well.
    pub fn execute_detailed(&self, id: &TaskId) -> DispatchResult<ExecutionOutcome> {
        let mut guard = self.state.lock();
        let State { registry, board, clock, log } = &mut *guard;
        let grid = self.grid.read();
        let outcome = self.executor.execute(id, Site { board, registry, clock, grid: &grid })?;
        log.extend(outcome.events.iter().cloned());
        Ok(outcome)
    }

    /// Plan and reserve crews for Pending tasks.  Returns the assigned task
    /// ids in run order; tasks left out stay Pending.
    pub fn optimize_schedule(&self) -> DispatchResult<Vec<TaskId>> {
        let (live, registry, grid) = {
            let guard = self.state.lock();
            let grid = self.grid.read();
            let live: Vec<Task> = guard.board.iter().filter(|t| !t.status.is_terminal()).cloned().collect();
            (live, guard.registry.clone(), grid.clone())
        };
        let schedule =
            tms_schedule::optimize_schedule(&live, &registry, &grid, &self.executor.router, self.config.policy);

        let mut guard = self.state.lock();
        let State { registry, board, clock, log } = &mut *guard;
        let now = clock.now();
        // Stock claims as they stand now, not as they stood when planning.
        let mut ledger = projected_ledger(board.iter(), registry);
        let mut order = Vec::with_capacity(schedule.assignments.len());
        for assignment in schedule.assignments {
            // State may have moved on while planning.
            let checked = board.get(&assignment.task).map_err(DispatchError::from).and_then(|task| {
                let crew = check_crew(task, &assignment.equipment, registry)?;
                let deltas = task.stock_deltas();
                ledger.check_deltas(&deltas)?;
                Ok((crew, deltas))
            });
            let (crew, deltas) = match checked {
                Ok(checked) => checked,
                Err(e) => {
                    warn!(task = %assignment.task, error = %e, "stale assignment skipped");
                    continue;
                }
            };
            match assign_crew(registry, board, &assignment.task, crew, now) {
                Ok(events) => {
                    if let Err(e) = ledger.apply_stock_deltas(&deltas, now) {
                        debug!(task = %assignment.task, error = %e, "ledger out of step");
                    }
                    log.extend(events);
                    order.push(assignment.task);
                }
                Err(e) => warn!(task = %assignment.task, error = %e, "stale assignment skipped"),
            }
        }
        info!(assigned = order.len(), deferred = schedule.deferred.len(), "schedule applied");
        Ok(order)
    }

    // ── Grid ──────────────────────────────────────────────────────────────

    /// Block or clear a cell.  Returns `true` if it changed.  Cells under a
    /// warehouse or equipment cannot be blocked.
    pub fn set_obstacle(&self, position: Position, blocked: bool) -> DispatchResult<bool> {
        let mut guard = self.state.lock();
        let mut grid = self.grid.write();
        if blocked {
            let occupied = guard.registry.warehouses().any(|w| w.position == position)
                || guard.registry.fleet().any(|e| e.position == position);
            if occupied {
                grid.index(position)?;
                return Err(SpatialError::InvalidPosition { position, reason: "cell is occupied" }.into());
            }
        }
        let changed = grid.set_obstacle(position, blocked)?;
        if changed {
            debug!(%position, blocked, version = grid.version(), "obstacle changed");
            guard.log.push(DispatchEvent::ObstacleChanged { position, blocked, version: grid.version() });
        }
        Ok(changed)
    }

    pub fn is_blocked(&self, position: Position) -> DispatchResult<bool> {
        Ok(self.grid.read().is_blocked(position)?)
    }

    /// Free cells one move away from `position`.
    pub fn neighbors(&self, position: Position) -> DispatchResult<Vec<Position>> {
        Ok(self.grid.read().neighbors(position)?)
    }

    /// Shortest route on the current grid, both endpoints included.
    pub fn route(&self, start: Position, goal: Position) -> DispatchResult<Vec<Position>> {
        let grid = self.grid.read();
        let Route { cells } = self.executor.router.route(&grid, start, goal)?;
        Ok(cells)
    }

    // ── Reports and events ────────────────────────────────────────────────

    pub fn status(&self) -> SystemStatus {
        let guard = self.state.lock();
        let grid = self.grid.read();
        report::system_status(&guard.registry, &guard.board, &guard.clock, &grid)
    }

    pub fn performance_report(&self) -> PerformanceReport {
        let guard = self.state.lock();
        let recent = guard.log.recent(0, REPORT_RECENT_EVENTS);
        report::performance_report(&guard.registry, &guard.board, &guard.clock, recent)
    }

    /// Logged events, newest first.
    pub fn recent_events(&self, offset: usize, limit: usize) -> Vec<DispatchEvent> {
        self.state.lock().log.recent(offset, limit)
    }

    /// Events recorded since start, including those no longer in the log.
    pub fn total_events(&self) -> u64 {
        self.state.lock().log.total()
    }

    /// Receiver for every event from now on.  Drop it to unsubscribe.
    pub fn subscribe(&self) -> Receiver<DispatchEvent> {
        self.state.lock().log.subscribe()
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> Snapshot {
        let guard = self.state.lock();
        let grid = self.grid.read();
        Snapshot {
            config:   self.config.clone(),
            grid:     grid.clone(),
            registry: guard.registry.clone(),
            board:    guard.board.clone(),
            clock:    guard.clock.clone(),
        }
    }
}

fn draft_of(spec: TaskSpec, products: impl IntoIterator<Item = (ProductId, u64)>, priority: i32) -> TaskDraft {
    products
        .into_iter()
        .fold(TaskDraft::new(spec), |draft, (product, quantity)| draft.with_product(product, quantity))
        .with_priority(priority)
}

//! `Registry` — products, warehouses, and equipment in one store.
//!
//! Every mutation validates fully before touching anything, so an `Err`
//! always means "nothing changed".  Mutations that alter observable state
//! return the [`DispatchEvent`]s they produced; the caller decides where
//! those go.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tms_core::{
    DispatchEvent, EquipmentId, EquipmentStatus, Position, ProductId, TaskId, Tick, WarehouseId,
};

use crate::equipment::{Equipment, EquipmentKind, EquipmentUpdate};
use crate::error::{RegistryError, RegistryResult};
use crate::product::{Product, ProductUpdate};
use crate::warehouse::{Warehouse, WarehouseUpdate};

/// Slack for floating-point load comparisons.
const LOAD_EPSILON: f64 = 1e-9;

/// One line of an atomic stock batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub warehouse: WarehouseId,
    pub product:   ProductId,
    pub delta:     i64,
}

impl StockDelta {
    pub fn new(warehouse: impl Into<WarehouseId>, product: impl Into<ProductId>, delta: i64) -> Self {
        Self { warehouse: warehouse.into(), product: product.into(), delta }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    products:   BTreeMap<ProductId, Product>,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    equipment:  BTreeMap<EquipmentId, Equipment>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-check every invariant; used after deserializing a snapshot.
    pub fn validate(&self) -> RegistryResult<()> {
        for (id, product) in &self.products {
            product.validate()?;
            if id != &product.id {
                return Err(RegistryError::invalid("product", format!("keyed as {id}, id {}", product.id)));
            }
        }
        for (id, warehouse) in &self.warehouses {
            warehouse.validate()?;
            if id != &warehouse.id {
                return Err(RegistryError::invalid(
                    "warehouse",
                    format!("keyed as {id}, id {}", warehouse.id),
                ));
            }
            self.check_stock(warehouse)?;
        }
        for (id, equipment) in &self.equipment {
            equipment.validate()?;
            if id != &equipment.id {
                return Err(RegistryError::invalid(
                    "equipment",
                    format!("keyed as {id}, id {}", equipment.id),
                ));
            }
            if let Some(home) = &equipment.home {
                self.warehouse(home)?;
            }
            if let Some(partner) = &equipment.hitched {
                self.check_hitch(equipment, self.equipment(partner)?)?;
            }
        }
        Ok(())
    }

    /// Both ends of a hitch agree: one truck, one frame, same cell.
    fn check_hitch(&self, a: &Equipment, b: &Equipment) -> RegistryResult<()> {
        let kinds = matches!(
            (a.kind, b.kind),
            (EquipmentKind::FrameTruck, EquipmentKind::Frame) | (EquipmentKind::Frame, EquipmentKind::FrameTruck)
        );
        if !kinds || b.hitched.as_ref() != Some(&a.id) || a.position != b.position {
            return Err(RegistryError::invalid(
                "equipment",
                format!("{} and {} are not a consistent truck/frame hitch", a.id, b.id),
            ));
        }
        Ok(())
    }

    // ── Products ──────────────────────────────────────────────────────────

    pub fn add_product(&mut self, product: Product) -> RegistryResult<()> {
        product.validate()?;
        if self.products.contains_key(&product.id) {
            return Err(RegistryError::DuplicateId { entity: "product", id: product.id.to_string() });
        }
        info!(product = %product.id, name = %product.name, "product added");
        self.products.insert(product.id.clone(), product);
        Ok(())
    }

    pub fn product(&self, id: &ProductId) -> RegistryResult<&Product> {
        self.products.get(id).ok_or_else(|| RegistryError::ProductNotFound(id.clone()))
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// The product catalog, for load computations.
    pub fn catalog(&self) -> &BTreeMap<ProductId, Product> {
        &self.products
    }

    /// Apply `update`.  A weight or volume change re-validates every
    /// warehouse holding the product and is refused if one would overflow.
    pub fn update_product(&mut self, id: &ProductId, update: &ProductUpdate) -> RegistryResult<&Product> {
        let mut updated = self.product(id)?.clone();
        update.apply_to(&mut updated);
        updated.validate()?;

        if update.changes_measure() {
            let mut catalog = self.products.clone();
            catalog.insert(id.clone(), updated.clone());
            for warehouse in self.warehouses.values().filter(|w| w.quantity(id) > 0) {
                let load = warehouse.load(&catalog);
                if load > warehouse.capacity + LOAD_EPSILON {
                    return Err(RegistryError::InsufficientCapacity {
                        warehouse: warehouse.id.clone(),
                        required:  load,
                        capacity:  warehouse.capacity,
                    });
                }
            }
        }

        let slot = self
            .products
            .get_mut(id)
            .ok_or_else(|| RegistryError::ProductNotFound(id.clone()))?;
        *slot = updated;
        Ok(slot)
    }

    /// Remove a product no warehouse holds.
    pub fn remove_product(&mut self, id: &ProductId) -> RegistryResult<Product> {
        self.product(id)?;
        if let Some(w) = self.warehouses.values().find(|w| w.quantity(id) > 0) {
            return Err(RegistryError::InUse {
                entity: "product",
                id:     id.to_string(),
                reason: format!("stocked in warehouse {}", w.id),
            });
        }
        self.products.remove(id).ok_or_else(|| RegistryError::ProductNotFound(id.clone()))
    }

    // ── Warehouses ────────────────────────────────────────────────────────

    /// Add a warehouse.  Its initial stock must reference known products and
    /// fit its capacity.
    pub fn add_warehouse(&mut self, warehouse: Warehouse) -> RegistryResult<()> {
        warehouse.validate()?;
        if self.warehouses.contains_key(&warehouse.id) {
            return Err(RegistryError::DuplicateId { entity: "warehouse", id: warehouse.id.to_string() });
        }
        self.check_stock(&warehouse)?;
        info!(warehouse = %warehouse.id, kind = %warehouse.kind, at = %warehouse.position, "warehouse added");
        self.warehouses.insert(warehouse.id.clone(), warehouse);
        Ok(())
    }

    pub fn warehouse(&self, id: &WarehouseId) -> RegistryResult<&Warehouse> {
        self.warehouses.get(id).ok_or_else(|| RegistryError::WarehouseNotFound(id.clone()))
    }

    pub fn warehouses(&self) -> impl Iterator<Item = &Warehouse> {
        self.warehouses.values()
    }

    /// Current load of `id` in its capacity basis.
    pub fn warehouse_load(&self, id: &WarehouseId) -> RegistryResult<f64> {
        Ok(self.warehouse(id)?.load(&self.products))
    }

    /// Apply `update`; a capacity cut below the current load is refused.
    pub fn update_warehouse(
        &mut self,
        id: &WarehouseId,
        update: &WarehouseUpdate,
    ) -> RegistryResult<&Warehouse> {
        let mut updated = self.warehouse(id)?.clone();
        update.apply_to(&mut updated);
        updated.validate()?;
        self.check_stock(&updated)?;

        let slot = self
            .warehouses
            .get_mut(id)
            .ok_or_else(|| RegistryError::WarehouseNotFound(id.clone()))?;
        *slot = updated;
        Ok(slot)
    }

    /// Remove an empty warehouse that is no crane's home.
    pub fn remove_warehouse(&mut self, id: &WarehouseId) -> RegistryResult<Warehouse> {
        let warehouse = self.warehouse(id)?;
        if !warehouse.stock.is_empty() {
            return Err(RegistryError::InUse {
                entity: "warehouse",
                id:     id.to_string(),
                reason: format!("holds {} product lines", warehouse.stock.len()),
            });
        }
        if let Some(e) = self.equipment.values().find(|e| e.home.as_ref() == Some(id)) {
            return Err(RegistryError::InUse {
                entity: "warehouse",
                id:     id.to_string(),
                reason: format!("home of equipment {}", e.id),
            });
        }
        self.warehouses.remove(id).ok_or_else(|| RegistryError::WarehouseNotFound(id.clone()))
    }

    // ── Equipment ─────────────────────────────────────────────────────────

    /// Add idle equipment.  A home warehouse, if given, must exist.
    pub fn add_equipment(&mut self, equipment: Equipment) -> RegistryResult<()> {
        equipment.validate()?;
        if self.equipment.contains_key(&equipment.id) {
            return Err(RegistryError::DuplicateId { entity: "equipment", id: equipment.id.to_string() });
        }
        if equipment.status.is_held() {
            return Err(RegistryError::invalid(
                "equipment",
                format!("{} added while {}", equipment.id, equipment.status),
            ));
        }
        if let Some(home) = &equipment.home {
            self.warehouse(home)?;
        }
        info!(equipment = %equipment.id, kind = %equipment.kind, at = %equipment.position, "equipment added");
        self.equipment.insert(equipment.id.clone(), equipment);
        Ok(())
    }

    pub fn equipment(&self, id: &EquipmentId) -> RegistryResult<&Equipment> {
        self.equipment.get(id).ok_or_else(|| RegistryError::EquipmentNotFound(id.clone()))
    }

    fn equipment_mut(&mut self, id: &EquipmentId) -> RegistryResult<&mut Equipment> {
        self.equipment.get_mut(id).ok_or_else(|| RegistryError::EquipmentNotFound(id.clone()))
    }

    /// All equipment in id order.
    pub fn fleet(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.values()
    }

    pub fn update_equipment(
        &mut self,
        id: &EquipmentId,
        update: &EquipmentUpdate,
    ) -> RegistryResult<&Equipment> {
        let mut updated = self.equipment(id)?.clone();
        update.apply_to(&mut updated);
        updated.validate()?;
        if let Some(home) = &updated.home {
            self.warehouse(home)?;
        }
        let slot = self.equipment_mut(id)?;
        *slot = updated;
        Ok(slot)
    }

    /// Remove equipment no task holds.
    pub fn remove_equipment(&mut self, id: &EquipmentId) -> RegistryResult<Equipment> {
        let equipment = self.equipment(id)?;
        if equipment.status.is_held() {
            return Err(RegistryError::InUse {
                entity: "equipment",
                id:     id.to_string(),
                reason: format!(
                    "{} by task {}",
                    equipment.status,
                    equipment.current_task.as_ref().map_or("?", |t| t.as_str())
                ),
            });
        }
        if let Some(partner) = &equipment.hitched {
            return Err(RegistryError::InUse {
                entity: "equipment",
                id:     id.to_string(),
                reason: format!("hitched to {partner}"),
            });
        }
        self.equipment.remove(id).ok_or_else(|| RegistryError::EquipmentNotFound(id.clone()))
    }

    // ── Frames ────────────────────────────────────────────────────────────

    /// Hitch idle `frame` to idle `truck`.  The frame must stand on the
    /// truck's cell or an adjacent one (diagonals included); it moves onto
    /// the truck's cell.
    pub fn attach_frame(&mut self, truck: &EquipmentId, frame: &EquipmentId, tick: Tick) -> RegistryResult<DispatchEvent> {
        let t = self.equipment(truck)?;
        let f = self.equipment(frame)?;
        if t.kind != EquipmentKind::FrameTruck || f.kind != EquipmentKind::Frame {
            return Err(RegistryError::invalid(
                "hitch",
                format!("{truck} is a {} and {frame} is a {}", t.kind, f.kind),
            ));
        }
        for unit in [t, f] {
            if !unit.is_idle() {
                return Err(RegistryError::AlreadyAssigned {
                    equipment: unit.id.clone(),
                    status:    unit.status,
                    task:      unit.current_task.clone(),
                });
            }
            if let Some(partner) = &unit.hitched {
                return Err(RegistryError::InUse {
                    entity: "equipment",
                    id:     unit.id.to_string(),
                    reason: format!("already hitched to {partner}"),
                });
            }
        }
        if t.position.chebyshev(f.position) > 1 {
            return Err(RegistryError::invalid(
                "hitch",
                format!("{frame} at {} is not next to {truck} at {}", f.position, t.position),
            ));
        }

        let at = t.position;
        self.equipment_mut(truck)?.hitched = Some(frame.clone());
        let f = self.equipment_mut(frame)?;
        f.hitched = Some(truck.clone());
        f.position = at;
        info!(%truck, %frame, "frame attached");
        Ok(DispatchEvent::FrameAttached { truck: truck.clone(), frame: frame.clone(), tick })
    }

    /// Unhitch the frame `truck` tows.  It stays where the truck is.
    pub fn detach_frame(&mut self, truck: &EquipmentId, tick: Tick) -> RegistryResult<DispatchEvent> {
        let t = self.equipment(truck)?;
        if t.status.is_held() {
            return Err(RegistryError::AlreadyAssigned {
                equipment: truck.clone(),
                status:    t.status,
                task:      t.current_task.clone(),
            });
        }
        let frame = match (t.kind, &t.hitched) {
            (EquipmentKind::FrameTruck, Some(frame)) => frame.clone(),
            _ => return Err(RegistryError::invalid("hitch", format!("{truck} tows no frame"))),
        };
        self.equipment_mut(&frame)?.hitched = None;
        self.equipment_mut(truck)?.hitched = None;
        info!(%truck, %frame, "frame detached");
        Ok(DispatchEvent::FrameDetached { truck: truck.clone(), frame, tick })
    }

    /// What `truck` can haul: the smaller of its own and its frame's rating.
    /// `None` for anything but a truck with a frame hitched.
    pub fn haul_capacity(&self, truck: &Equipment) -> Option<f64> {
        if truck.kind != EquipmentKind::FrameTruck {
            return None;
        }
        let frame = self.equipment.get(truck.hitched.as_ref()?)?;
        Some(truck.capacity.min(frame.capacity))
    }

    // ── Equipment status ──────────────────────────────────────────────────

    /// Idle → Assigned, held by `task`.
    pub fn reserve_equipment(
        &mut self,
        id: &EquipmentId,
        task: &TaskId,
        tick: Tick,
    ) -> RegistryResult<DispatchEvent> {
        let equipment = self.equipment_mut(id)?;
        if equipment.status != EquipmentStatus::Idle {
            return Err(RegistryError::AlreadyAssigned {
                equipment: id.clone(),
                status:    equipment.status,
                task:      equipment.current_task.clone(),
            });
        }
        equipment.current_task = Some(task.clone());
        Ok(set_status(equipment, EquipmentStatus::Assigned, tick))
    }

    /// Assigned → Busy for the task that holds it.  Opens a busy stint.
    pub fn mark_busy(&mut self, id: &EquipmentId, task: &TaskId, tick: Tick) -> RegistryResult<DispatchEvent> {
        let equipment = self.equipment_mut(id)?;
        if equipment.status != EquipmentStatus::Assigned || !equipment.is_held_by(task) {
            return Err(RegistryError::NotHeldBy { equipment: id.clone(), task: task.clone() });
        }
        equipment.busy_since = Some(tick);
        Ok(set_status(equipment, EquipmentStatus::Busy, tick))
    }

    /// Assigned/Busy → Idle, closing any busy stint.  `None` if the
    /// equipment was not held.
    pub fn release_equipment(&mut self, id: &EquipmentId, tick: Tick) -> RegistryResult<Option<DispatchEvent>> {
        let equipment = self.equipment_mut(id)?;
        if !equipment.status.is_held() {
            return Ok(None);
        }
        if let Some(since) = equipment.busy_since.take() {
            equipment.busy_ticks += tick.since(since);
        }
        equipment.current_task = None;
        Ok(Some(set_status(equipment, EquipmentStatus::Idle, tick)))
    }

    /// Idle → OutOfService.  A hitched frame must be detached first.
    pub fn set_out_of_service(&mut self, id: &EquipmentId, tick: Tick) -> RegistryResult<DispatchEvent> {
        let equipment = self.equipment_mut(id)?;
        if let (EquipmentKind::Frame, Some(truck)) = (equipment.kind, &equipment.hitched) {
            return Err(RegistryError::InUse {
                entity: "equipment",
                id:     id.to_string(),
                reason: format!("hitched to {truck}"),
            });
        }
        if equipment.status != EquipmentStatus::Idle {
            return Err(RegistryError::AlreadyAssigned {
                equipment: id.clone(),
                status:    equipment.status,
                task:      equipment.current_task.clone(),
            });
        }
        Ok(set_status(equipment, EquipmentStatus::OutOfService, tick))
    }

    /// OutOfService → Idle.
    pub fn return_to_service(&mut self, id: &EquipmentId, tick: Tick) -> RegistryResult<DispatchEvent> {
        let equipment = self.equipment_mut(id)?;
        if equipment.status != EquipmentStatus::OutOfService {
            return Err(RegistryError::invalid(
                "equipment",
                format!("{id} is {}, not out of service", equipment.status),
            ));
        }
        Ok(set_status(equipment, EquipmentStatus::Idle, tick))
    }

    /// Place equipment at `to`, returning its previous position.  A hitched
    /// frame comes along.  Grid validity is the caller's concern.
    pub fn relocate_equipment(&mut self, id: &EquipmentId, to: Position) -> RegistryResult<Position> {
        let equipment = self.equipment_mut(id)?;
        let from = std::mem::replace(&mut equipment.position, to);
        let towed = equipment.hitched.clone().filter(|_| equipment.kind == EquipmentKind::FrameTruck);
        if let Some(frame) = towed {
            self.equipment_mut(&frame)?.position = to;
        }
        Ok(from)
    }

    /// Move idle equipment to `to`, charging `busy_ticks` of work.  Frames
    /// do not move on their own.
    pub fn record_move(
        &mut self,
        id: &EquipmentId,
        to: Position,
        moves: u32,
        busy_ticks: u64,
        tick: Tick,
    ) -> RegistryResult<DispatchEvent> {
        let equipment = self.equipment(id)?;
        if equipment.kind == EquipmentKind::Frame {
            return Err(RegistryError::invalid("equipment", format!("frame {id} only moves with a truck")));
        }
        if equipment.status != EquipmentStatus::Idle {
            return Err(RegistryError::AlreadyAssigned {
                equipment: id.clone(),
                status:    equipment.status,
                task:      equipment.current_task.clone(),
            });
        }
        let from = self.relocate_equipment(id, to)?;
        self.equipment_mut(id)?.busy_ticks += busy_ticks;
        Ok(DispatchEvent::EquipmentMoved { equipment: id.clone(), from, to, moves, tick })
    }

    // ── Stock ─────────────────────────────────────────────────────────────

    /// Total weight of `quantity` of each listed product.
    pub fn weight_of<'a>(
        &self,
        items: impl IntoIterator<Item = (&'a ProductId, &'a u64)>,
    ) -> RegistryResult<f64> {
        items
            .into_iter()
            .map(|(p, q)| self.product(p).map(|prod| prod.weight_of(*q)))
            .sum()
    }

    /// Add `delta` (may be negative) of `product` to `warehouse`.
    ///
    /// # Errors
    /// `NegativeStock` if the quantity would drop below zero,
    /// `InsufficientCapacity` if the load would exceed capacity.  Stock is
    /// unchanged on error.
    pub fn adjust_stock(
        &mut self,
        warehouse: &WarehouseId,
        product: &ProductId,
        delta: i64,
        tick: Tick,
    ) -> RegistryResult<DispatchEvent> {
        let line = StockDelta { warehouse: warehouse.clone(), product: product.clone(), delta };
        let mut events = self.apply_stock_deltas(&[line], tick)?;
        events
            .pop()
            .ok_or_else(|| RegistryError::invalid("stock delta", "batch produced no event"))
    }

    /// Apply every delta or none.  The whole batch is checked against the
    /// net result per warehouse before anything is written.
    pub fn apply_stock_deltas(&mut self, deltas: &[StockDelta], tick: Tick) -> RegistryResult<Vec<DispatchEvent>> {
        self.check_deltas(deltas)?;

        // Lines apply in order; the final quantity per (warehouse, product)
        // is written once at the end.
        let mut running: BTreeMap<(WarehouseId, ProductId), i128> = BTreeMap::new();
        let mut events = Vec::with_capacity(deltas.len());
        for d in deltas {
            let key = (d.warehouse.clone(), d.product.clone());
            let have = match running.get(&key) {
                Some(q) => *q,
                None => self.warehouse(&d.warehouse)?.quantity(&d.product) as i128,
            };
            let now = have + d.delta as i128;
            running.insert(key, now);
            debug!(warehouse = %d.warehouse, product = %d.product, delta = d.delta, quantity = now as i64, "stock adjusted");
            events.push(DispatchEvent::StockAdjusted {
                warehouse: d.warehouse.clone(),
                product:   d.product.clone(),
                delta:     d.delta,
                quantity:  now.max(0) as u64,
                tick,
            });
        }

        for ((wid, pid), quantity) in running {
            let warehouse = self
                .warehouses
                .get_mut(&wid)
                .ok_or_else(|| RegistryError::WarehouseNotFound(wid.clone()))?;
            if quantity <= 0 {
                warehouse.stock.remove(&pid);
            } else {
                warehouse.stock.insert(pid, quantity as u64);
            }
        }
        Ok(events)
    }

    /// Dry run of [`apply_stock_deltas`][Self::apply_stock_deltas].
    pub fn check_deltas(&self, deltas: &[StockDelta]) -> RegistryResult<()> {
        // Net change per (warehouse, product), then per-warehouse checks on
        // the resulting stock.
        let mut net: BTreeMap<&WarehouseId, BTreeMap<&ProductId, i128>> = BTreeMap::new();
        for d in deltas {
            self.warehouse(&d.warehouse)?;
            self.product(&d.product)?;
            *net.entry(&d.warehouse).or_default().entry(&d.product).or_default() += d.delta as i128;
        }

        for (wid, lines) in net {
            let warehouse = self.warehouse(wid)?;
            let mut projected = warehouse.clone();
            let mut grows = false;
            for (pid, change) in lines {
                let have = warehouse.quantity(pid) as i128;
                let now = have + change;
                if now < 0 {
                    return Err(RegistryError::NegativeStock {
                        warehouse: wid.clone(),
                        product:   pid.clone(),
                        have:      have as u64,
                        delta:     change.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                    });
                }
                let now = u64::try_from(now).map_err(|_| {
                    RegistryError::invalid("stock delta", format!("{pid} quantity overflows"))
                })?;
                grows |= change > 0;
                if now == 0 {
                    projected.stock.remove(pid);
                } else {
                    projected.stock.insert(pid.clone(), now);
                }
            }
            if grows {
                self.check_stock(&projected)?;
            }
        }
        Ok(())
    }

    /// Every stocked product exists and the load fits the capacity.
    fn check_stock(&self, warehouse: &Warehouse) -> RegistryResult<()> {
        for pid in warehouse.stock.keys() {
            self.product(pid)?;
        }
        let load = warehouse.load(&self.products);
        if load > warehouse.capacity + LOAD_EPSILON {
            return Err(RegistryError::InsufficientCapacity {
                warehouse: warehouse.id.clone(),
                required:  load,
                capacity:  warehouse.capacity,
            });
        }
        Ok(())
    }
}

fn set_status(equipment: &mut Equipment, to: EquipmentStatus, tick: Tick) -> DispatchEvent {
    let from = std::mem::replace(&mut equipment.status, to);
    debug!(equipment = %equipment.id, %from, %to, "equipment status");
    DispatchEvent::EquipmentStatusChanged { equipment: equipment.id.clone(), from, to, tick }
}

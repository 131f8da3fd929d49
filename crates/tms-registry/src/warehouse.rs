//! Warehouses and their stock.
//!
//! A warehouse's load is Σ quantity × unit measure over its stock, where the
//! unit measure is the product's weight or volume depending on the
//! warehouse's [`CapacityBasis`].  The load never exceeds `capacity`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use tms_core::{Position, ProductId, TaskKind, WarehouseId};

use crate::capability::SiteAsset;
use crate::error::{RegistryError, RegistryResult};
use crate::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseKind {
    /// End-of-line store next to production.
    Terminal,
    /// Finished goods awaiting shipment; the source of ship transports.
    FinishedGoods,
    /// Overflow or staging area.
    Temporary,
}

impl WarehouseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarehouseKind::Terminal      => "terminal",
            WarehouseKind::FinishedGoods => "finished_goods",
            WarehouseKind::Temporary     => "temporary",
        }
    }

    /// Parse a type tag (`"terminal"`, `"finished_goods"`/`"product"`,
    /// `"temporary"`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "terminal"                  => Some(WarehouseKind::Terminal),
            "finished_goods" | "product" => Some(WarehouseKind::FinishedGoods),
            "temporary"                 => Some(WarehouseKind::Temporary),
            _ => None,
        }
    }
}

impl fmt::Display for WarehouseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which product measure counts against a warehouse's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityBasis {
    #[default]
    Mass,
    Volume,
}

impl CapacityBasis {
    /// Per-unit measure of `product` under this basis.
    pub fn unit_measure(self, product: &Product) -> f64 {
        match self {
            CapacityBasis::Mass   => product.weight,
            CapacityBasis::Volume => product.volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id:       WarehouseId,
    pub name:     String,
    pub kind:     WarehouseKind,
    pub position: Position,
    pub capacity: f64,
    #[serde(default)]
    pub basis:    CapacityBasis,
    /// Product → quantity.  Zero quantities are not stored.
    #[serde(default)]
    pub stock:    BTreeMap<ProductId, u64>,
}

impl Warehouse {
    pub fn new(
        id: impl Into<WarehouseId>,
        name: impl Into<String>,
        kind: WarehouseKind,
        position: Position,
        capacity: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position,
            capacity,
            basis: CapacityBasis::default(),
            stock: BTreeMap::new(),
        }
    }

    /// Factory from a type tag; `Invalid` if the tag is unknown.
    pub fn from_tag(
        tag: &str,
        id: impl Into<WarehouseId>,
        name: impl Into<String>,
        position: Position,
        capacity: f64,
    ) -> RegistryResult<Self> {
        let kind = WarehouseKind::from_tag(tag)
            .ok_or_else(|| RegistryError::invalid("warehouse", format!("unknown type tag {tag:?}")))?;
        Ok(Self::new(id, name, kind, position, capacity))
    }

    pub fn with_basis(mut self, basis: CapacityBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Initial stock, checked against capacity when the warehouse is added.
    pub fn with_stock(mut self, product: impl Into<ProductId>, quantity: u64) -> Self {
        let product = product.into();
        if quantity == 0 {
            self.stock.remove(&product);
        } else {
            self.stock.insert(product, quantity);
        }
        self
    }

    pub fn quantity(&self, product: &ProductId) -> u64 {
        self.stock.get(product).copied().unwrap_or(0)
    }

    /// `true` if the warehouse holds at least `quantity` of every listed product.
    pub fn holds_all<'a>(&self, items: impl IntoIterator<Item = (&'a ProductId, &'a u64)>) -> bool {
        items.into_iter().all(|(p, q)| self.quantity(p) >= *q)
    }

    /// Σ quantity × unit measure.  Products missing from `catalog` count
    /// as zero; the registry never lets that happen.
    pub fn load(&self, catalog: &BTreeMap<ProductId, Product>) -> f64 {
        self.stock
            .iter()
            .filter_map(|(p, q)| catalog.get(p).map(|prod| self.basis.unit_measure(prod) * *q as f64))
            .sum()
    }

    pub fn available_capacity(&self, catalog: &BTreeMap<ProductId, Product>) -> f64 {
        (self.capacity - self.load(catalog)).max(0.0)
    }

    /// Load as a percentage of capacity.
    pub fn utilization(&self, catalog: &BTreeMap<ProductId, Product>) -> f64 {
        if self.capacity > 0.0 {
            self.load(catalog) / self.capacity * 100.0
        } else {
            0.0
        }
    }

    pub(crate) fn validate(&self) -> RegistryResult<()> {
        if self.id.is_blank() {
            return Err(RegistryError::invalid("warehouse", "id is blank"));
        }
        if !(self.capacity.is_finite() && self.capacity > 0.0) {
            return Err(RegistryError::invalid(
                "warehouse",
                format!("{}: capacity {}", self.id, self.capacity),
            ));
        }
        Ok(())
    }
}

impl SiteAsset for Warehouse {
    fn position(&self) -> Position {
        self.position
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Ship transports leave from finished goods only; every kind takes
    /// transfers and handling.
    fn accepts(&self, kind: TaskKind) -> bool {
        match kind {
            TaskKind::ShipTransport => self.kind == WarehouseKind::FinishedGoods,
            TaskKind::InternalTransfer | TaskKind::Load | TaskKind::Unload => true,
        }
    }
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseUpdate {
    pub name:     Option<String>,
    pub position: Option<Position>,
    pub capacity: Option<f64>,
    pub basis:    Option<CapacityBasis>,
}

impl WarehouseUpdate {
    pub(crate) fn apply_to(&self, warehouse: &mut Warehouse) {
        if let Some(name) = &self.name {
            warehouse.name = name.clone();
        }
        if let Some(position) = self.position {
            warehouse.position = position;
        }
        if let Some(capacity) = self.capacity {
            warehouse.capacity = capacity;
        }
        if let Some(basis) = self.basis {
            warehouse.basis = basis;
        }
    }
}

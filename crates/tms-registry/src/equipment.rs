//! Handling equipment: cranes, frame trucks, and frames.

use std::fmt;

use serde::{Deserialize, Serialize};

use tms_core::{EquipmentId, EquipmentStatus, Position, TaskId, TaskKind, Tick, WarehouseId};

use crate::capability::SiteAsset;
use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    /// Overhead crane bound to a warehouse; lifts goods on and off trucks.
    Crane,
    /// Tractor unit that hauls a frame between sites.
    FrameTruck,
    /// Passive trailer; rides with the truck it is hitched to and is never
    /// assigned on its own.
    Frame,
}

impl EquipmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentKind::Crane      => "crane",
            EquipmentKind::FrameTruck => "frame_truck",
            EquipmentKind::Frame      => "frame",
        }
    }

    /// Default lifting / hauling capacity in tonnes.
    pub fn default_capacity(self) -> f64 {
        match self {
            EquipmentKind::Crane      => 50.0,
            EquipmentKind::FrameTruck => 100.0,
            EquipmentKind::Frame      => 80.0,
        }
    }

    pub fn accepts(self, kind: TaskKind) -> bool {
        match self {
            EquipmentKind::Crane => matches!(
                kind,
                TaskKind::Load | TaskKind::Unload | TaskKind::ShipTransport
            ),
            EquipmentKind::FrameTruck => matches!(
                kind,
                TaskKind::ShipTransport | TaskKind::InternalTransfer
            ),
            EquipmentKind::Frame => false,
        }
    }

    /// Parse a type tag (`"crane"`, `"frame_truck"`/`"truck"`, `"frame"`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "crane"                                => Some(EquipmentKind::Crane),
            "frame_truck" | "frametruck" | "truck" => Some(EquipmentKind::FrameTruck),
            "frame"                                => Some(EquipmentKind::Frame),
            _ => None,
        }
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id:           EquipmentId,
    pub name:         String,
    pub kind:         EquipmentKind,
    pub position:     Position,
    /// Warehouse a crane is installed at.
    #[serde(default)]
    pub home:         Option<WarehouseId>,
    pub capacity:     f64,
    #[serde(default)]
    pub status:       EquipmentStatus,
    #[serde(default)]
    pub current_task: Option<TaskId>,
    /// Ticks spent `Busy`, summed over completed stints.
    #[serde(default)]
    pub busy_ticks:   u64,
    #[serde(default)]
    pub busy_since:   Option<Tick>,
    /// The frame a truck tows, or the truck towing a frame.
    #[serde(default)]
    pub hitched:      Option<EquipmentId>,
}

impl Equipment {
    /// New idle equipment with the kind's default capacity.
    pub fn new(
        id: impl Into<EquipmentId>,
        name: impl Into<String>,
        kind: EquipmentKind,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position,
            home: None,
            capacity: kind.default_capacity(),
            status: EquipmentStatus::Idle,
            current_task: None,
            busy_ticks: 0,
            busy_since: None,
            hitched: None,
        }
    }

    /// Factory from a type tag; `Invalid` if the tag is unknown.
    pub fn from_tag(
        tag: &str,
        id: impl Into<EquipmentId>,
        name: impl Into<String>,
        position: Position,
    ) -> RegistryResult<Self> {
        let kind = EquipmentKind::from_tag(tag)
            .ok_or_else(|| RegistryError::invalid("equipment", format!("unknown type tag {tag:?}")))?;
        Ok(Self::new(id, name, kind, position))
    }

    pub fn with_home(mut self, home: impl Into<WarehouseId>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn is_idle(&self) -> bool {
        self.status == EquipmentStatus::Idle
    }

    /// `true` if `task` currently holds this equipment.
    pub fn is_held_by(&self, task: &TaskId) -> bool {
        self.status.is_held() && self.current_task.as_ref() == Some(task)
    }

    pub fn is_hitched(&self) -> bool {
        self.hitched.is_some()
    }

    /// Busy ticks including an open stint up to `now`.
    pub fn busy_ticks_at(&self, now: Tick) -> u64 {
        self.busy_ticks + self.busy_since.map_or(0, |s| now.since(s))
    }

    pub(crate) fn validate(&self) -> RegistryResult<()> {
        if self.id.is_blank() {
            return Err(RegistryError::invalid("equipment", "id is blank"));
        }
        if !(self.capacity.is_finite() && self.capacity >= 0.0) {
            return Err(RegistryError::invalid(
                "equipment",
                format!("{}: capacity {}", self.id, self.capacity),
            ));
        }
        if self.status.is_held() != self.current_task.is_some() {
            return Err(RegistryError::invalid(
                "equipment",
                format!("{}: status {} with task {:?}", self.id, self.status, self.current_task),
            ));
        }
        Ok(())
    }
}

impl SiteAsset for Equipment {
    fn position(&self) -> Position {
        self.position
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    fn accepts(&self, kind: TaskKind) -> bool {
        self.kind.accepts(kind)
    }
}

/// Partial update; `None` fields are left alone.  Status and position change
/// only through the dispatch operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentUpdate {
    pub name:     Option<String>,
    pub capacity: Option<f64>,
    /// `Some(None)` clears the home warehouse.
    pub home:     Option<Option<WarehouseId>>,
}

impl EquipmentUpdate {
    pub(crate) fn apply_to(&self, equipment: &mut Equipment) {
        if let Some(name) = &self.name {
            equipment.name = name.clone();
        }
        if let Some(capacity) = self.capacity {
            equipment.capacity = capacity;
        }
        if let Some(home) = &self.home {
            equipment.home = home.clone();
        }
    }
}

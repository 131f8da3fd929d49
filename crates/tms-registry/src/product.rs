//! Product catalog entries.

use serde::{Deserialize, Serialize};

use tms_core::ProductId;

use crate::error::{RegistryError, RegistryResult};

/// One catalog entry.  Weight is in tonnes, volume in cubic metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id:         ProductId,
    pub name:       String,
    pub weight:     f64,
    pub volume:     f64,
    #[serde(default = "default_category")]
    pub category:   String,
    #[serde(default)]
    pub unit_price: f64,
}

fn default_category() -> String {
    "default".to_owned()
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, weight: f64, volume: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            volume,
            category: default_category(),
            unit_price: 0.0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// Total weight of `quantity` units.
    pub fn weight_of(&self, quantity: u64) -> f64 {
        self.weight * quantity as f64
    }

    pub(crate) fn validate(&self) -> RegistryResult<()> {
        if self.id.is_blank() {
            return Err(RegistryError::invalid("product", "id is blank"));
        }
        if !(self.weight.is_finite() && self.weight >= 0.0) {
            return Err(RegistryError::invalid("product", format!("{}: weight {}", self.id, self.weight)));
        }
        if !(self.volume.is_finite() && self.volume >= 0.0) {
            return Err(RegistryError::invalid("product", format!("{}: volume {}", self.id, self.volume)));
        }
        if !(self.unit_price.is_finite() && self.unit_price >= 0.0) {
            return Err(RegistryError::invalid(
                "product",
                format!("{}: unit price {}", self.id, self.unit_price),
            ));
        }
        Ok(())
    }
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductUpdate {
    pub name:       Option<String>,
    pub weight:     Option<f64>,
    pub volume:     Option<f64>,
    pub category:   Option<String>,
    pub unit_price: Option<f64>,
}

impl ProductUpdate {
    /// `true` if applying this update can change a warehouse's load.
    pub fn changes_measure(&self) -> bool {
        self.weight.is_some() || self.volume.is_some()
    }

    pub(crate) fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(weight) = self.weight {
            product.weight = weight;
        }
        if let Some(volume) = self.volume {
            product.volume = volume;
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(unit_price) = self.unit_price {
            product.unit_price = unit_price;
        }
    }
}

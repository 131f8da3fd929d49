//! Draft validation against the registry.
//!
//! The board stores whatever it is given; these checks run first, under
//! the same lock as the insert.

use tms_core::{ProductId, WarehouseId};
use tms_registry::{Registry, SiteAsset, WarehouseKind};

use crate::error::{TaskError, TaskResult};
use crate::spec::TaskSpec;
use crate::task::TaskDraft;

/// Check that a draft is well formed and every id it names exists.
///
/// - at least one product line, every quantity in `1..=i64::MAX`, every
///   product known;
/// - referenced warehouses exist and accept the task kind;
/// - an internal transfer's source and target differ.
pub fn validate_draft(draft: &TaskDraft, registry: &Registry) -> TaskResult<()> {
    if draft.products.is_empty() {
        return Err(TaskError::Invalid("no products requested".into()));
    }
    for (product, quantity) in &draft.products {
        if *quantity == 0 {
            return Err(TaskError::Invalid(format!("zero quantity of {product}")));
        }
        if *quantity > i64::MAX as u64 {
            return Err(TaskError::Invalid(format!("quantity of {product} out of range")));
        }
        registry.product(product)?;
    }

    if let TaskSpec::InternalTransfer { source, target } = &draft.spec {
        if source == target {
            return Err(TaskError::Invalid(format!("transfer from {source} to itself")));
        }
    }

    let kind = draft.spec.kind();
    for id in draft.spec.warehouses() {
        let warehouse = registry.warehouse(id)?;
        if !warehouse.accepts(kind) {
            return Err(TaskError::Unsupported(format!("{} warehouse {id} for {kind}", warehouse.kind)));
        }
    }
    Ok(())
}

/// The lowest-id finished-goods warehouse holding every requested quantity.
pub fn resolve_ship_source<'a>(
    registry: &Registry,
    products: impl IntoIterator<Item = (&'a ProductId, &'a u64)> + Clone,
) -> TaskResult<WarehouseId> {
    registry
        .warehouses()
        .filter(|w| w.kind == WarehouseKind::FinishedGoods)
        .find(|w| w.holds_all(products.clone()))
        .map(|w| w.id.clone())
        .ok_or(TaskError::NoShipSource)
}

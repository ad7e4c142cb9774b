use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use billbook_core::{DomainError, ItemId};
use billbook_inventory::{CatalogItem, NewCatalogItem};

use crate::store::{Catalog, StoreError};

use super::ServiceResult;

/// Catalog maintenance outside of reservations.
#[derive(Debug)]
pub struct CatalogService<C> {
    catalog: C,
}

fn sku_taken(err: StoreError, sku: &str) -> super::ServiceError {
    match err {
        StoreError::UniqueConstraintViolation(_) => {
            DomainError::invalid(format!("item with SKU {sku} already exists")).into()
        }
        other => other.into(),
    }
}

impl<C: Catalog> CatalogService<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn get(&self, id: ItemId) -> ServiceResult<CatalogItem> {
        Ok(self.catalog.get(id)?)
    }

    /// Add an item with its opening stock. SKUs are unique.
    #[instrument(skip(self, input, now), fields(sku = %input.sku), err)]
    pub fn register_item(
        &self,
        input: NewCatalogItem,
        opening_stock: Decimal,
        now: DateTime<Utc>,
    ) -> ServiceResult<CatalogItem> {
        let item = CatalogItem::register(ItemId::new(), input, opening_stock, now)?;
        self.catalog
            .insert(item.clone())
            .map_err(|e| sku_taken(e, item.sku()))?;
        info!(item_id = %item.id_typed(), sku = item.sku(), stock = %item.stock_quantity(), "item registered");
        Ok(item)
    }

    #[instrument(skip(self, input), err)]
    pub fn update_item(&self, id: ItemId, input: NewCatalogItem) -> ServiceResult<CatalogItem> {
        let sku = input.sku.clone();
        let item = self.catalog.revise(id, input).map_err(|e| sku_taken(e, &sku))?;
        info!(item_id = %id, "item updated");
        Ok(item)
    }

    /// Set on-hand stock outright (stock count, goods received).
    #[instrument(skip(self), err)]
    pub fn correct_stock(&self, id: ItemId, quantity: Decimal) -> ServiceResult<CatalogItem> {
        let item = self.catalog.set_stock(id, quantity)?;
        info!(item_id = %id, stock = %item.stock_quantity(), "stock corrected");
        if item.is_low_stock() {
            warn!(item_id = %id, stock = %item.stock_quantity(), min = %item.min_stock_level(), "item at or below minimum stock");
        }
        Ok(item)
    }

    #[instrument(skip(self), err)]
    pub fn deactivate(&self, id: ItemId) -> ServiceResult<CatalogItem> {
        let item = self.catalog.deactivate(id)?;
        info!(item_id = %id, "item deactivated");
        Ok(item)
    }

    /// Distinct categories of active items, sorted.
    pub fn categories(&self) -> ServiceResult<Vec<String>> {
        let categories: BTreeSet<String> = self
            .catalog
            .list()?
            .into_iter()
            .filter(CatalogItem::is_active)
            .map(|i| i.category().to_string())
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Active items at or below their minimum stock level, lowest stock first.
    pub fn low_stock(&self) -> ServiceResult<Vec<CatalogItem>> {
        let mut items: Vec<CatalogItem> = self
            .catalog
            .list()?
            .into_iter()
            .filter(|i| i.is_active() && i.is_low_stock())
            .collect();
        items.sort_by_key(|i| i.stock_quantity());
        Ok(items)
    }
}

//! Inventory reservation coordinator.
//!
//! Moves stock for invoice lines as one all-or-nothing batch. Each per-item
//! change goes through the catalog's conditional decrement, so two batches
//! racing for the same stock can never both win. When a later item in a batch
//! fails, the decrements already applied are given back before the error is
//! returned.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use billbook_core::{DomainError, DomainResult, ItemId, Quantity};
use billbook_invoicing::LineItem;

use crate::service::ServiceError;
use crate::store::{Catalog, ItemLookup, StoreError};

/// Per-item quantities a batch moved (or would move).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    quantities: BTreeMap<ItemId, Quantity>,
}

impl Reservation {
    /// Total demand per item. Lines naming the same item are summed.
    pub fn from_lines(lines: &[LineItem]) -> DomainResult<Self> {
        let mut quantities: BTreeMap<ItemId, Quantity> = BTreeMap::new();
        for line in lines {
            line.validate()?;
            let entry = quantities.entry(line.item_id).or_default();
            *entry = entry
                .checked_add(line.quantity)
                .ok_or_else(|| DomainError::invalid("line quantities overflow"))?;
        }
        Ok(Self { quantities })
    }

    pub fn quantity(&self, id: ItemId) -> Quantity {
        self.quantities.get(&id).copied().unwrap_or_default()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.quantities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, Quantity)> + '_ {
        self.quantities.iter().map(|(id, qty)| (*id, *qty))
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

fn ensure_all_active(lookup: &ItemLookup) -> DomainResult<()> {
    if let Some(id) = lookup.missing.first() {
        return Err(DomainError::ItemNotFound(*id));
    }
    if let Some(id) = lookup.inactive.first() {
        return Err(DomainError::ItemInactive(*id));
    }
    Ok(())
}

/// Coordinates stock movements for document lines against a [`Catalog`].
#[derive(Debug, Clone)]
pub struct ReservationCoordinator<C> {
    catalog: C,
}

impl<C> ReservationCoordinator<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }
}

impl<C: Catalog> ReservationCoordinator<C> {
    /// Check that every referenced item exists and is active, without
    /// touching stock.
    pub fn verify_items(&self, lines: &[LineItem]) -> Result<ItemLookup, ServiceError> {
        let demand = Reservation::from_lines(lines)?;
        let lookup = self.catalog.find_active_items_by_ids(&demand.item_ids())?;
        ensure_all_active(&lookup)?;
        Ok(lookup)
    }

    /// Take stock for `lines`, all or nothing.
    ///
    /// Fails with `ItemNotFound`/`ItemInactive` for unusable items and with
    /// `InsufficientStock` when an item's combined demand exceeds what is on
    /// hand. On failure no stock has moved.
    pub fn reserve(&self, lines: &[LineItem]) -> Result<Reservation, ServiceError> {
        let demand = Reservation::from_lines(lines)?;
        let lookup = self.catalog.find_active_items_by_ids(&demand.item_ids())?;
        ensure_all_active(&lookup)?;

        for (id, required) in demand.iter() {
            let Some(item) = lookup.get(id) else {
                return Err(DomainError::ItemNotFound(id).into());
            };
            if !item.can_reserve(required) {
                warn!(item_id = %id, available = %item.stock_quantity(), required = %required, "reservation rejected");
                return Err(insufficient(&lookup, id, item.stock_quantity(), required).into());
            }
        }

        self.take_all(demand.iter().collect(), &lookup)?;
        info!(items = demand.quantities.len(), "stock reserved");
        Ok(demand)
    }

    /// Move a document from the `old` lines' reservation to the `new` lines'.
    ///
    /// New demand is checked against what each item would have if the old
    /// reservation were returned first. Only the net difference per item is
    /// applied. On failure every applied delta is undone, so the old
    /// reservation is still in force.
    pub fn re_reserve(
        &self,
        old: &[LineItem],
        new: &[LineItem],
    ) -> Result<Reservation, ServiceError> {
        let held = Reservation::from_lines(old)?;
        let wanted = Reservation::from_lines(new)?;
        let lookup = self.catalog.find_active_items_by_ids(&wanted.item_ids())?;
        ensure_all_active(&lookup)?;

        for (id, required) in wanted.iter() {
            let Some(item) = lookup.get(id) else {
                return Err(DomainError::ItemNotFound(id).into());
            };
            let pool = item
                .stock_quantity()
                .checked_add(held.quantity(id))
                .ok_or_else(|| DomainError::invalid("stock quantity overflow"))?;
            if pool < required {
                warn!(item_id = %id, available = %pool, required = %required, "re-reservation rejected");
                return Err(insufficient(&lookup, id, pool, required).into());
            }
        }

        let mut takes = Vec::new();
        let mut returns = Vec::new();
        let mut ids: Vec<ItemId> = held.item_ids();
        ids.extend(wanted.item_ids());
        ids.sort();
        ids.dedup();
        for id in ids {
            let (before, after) = (held.quantity(id), wanted.quantity(id));
            if after > before {
                takes.push((id, after - before));
            } else if before > after {
                returns.push((id, before - after));
            }
        }

        // Decrements first: they are the only step that can fail on stock.
        self.take_all(takes, &lookup)?;
        self.give_back(&returns);
        info!(old_items = held.quantities.len(), new_items = wanted.quantities.len(), "stock re-reserved");
        Ok(wanted)
    }

    /// Return the stock held by `lines`.
    ///
    /// Callers invoke this once per document; releasing twice over-credits.
    /// If one increment fails, the increments already applied are taken
    /// back, so on error the reservation is still held in full.
    pub fn release(&self, lines: &[LineItem]) -> Result<Reservation, ServiceError> {
        let held = Reservation::from_lines(lines)?;
        let mut applied = Vec::with_capacity(held.quantities.len());
        for (id, quantity) in held.iter() {
            match self.catalog.atomic_increment_stock(id, quantity) {
                Ok(stock) => {
                    debug!(item_id = %id, returned = %quantity, stock = %stock, "stock released");
                    applied.push((id, quantity));
                }
                Err(err) => {
                    warn!(item_id = %id, error = %err, compensating = applied.len(), "stock increment failed");
                    self.take_back(&applied);
                    return Err(err.into());
                }
            }
        }
        info!(items = held.quantities.len(), "reservation released");
        Ok(held)
    }

    /// Apply conditional decrements in order, undoing them all if one fails.
    fn take_all(
        &self,
        deltas: Vec<(ItemId, Quantity)>,
        lookup: &ItemLookup,
    ) -> Result<(), ServiceError> {
        let mut applied = Vec::with_capacity(deltas.len());
        for (id, quantity) in deltas {
            match self.catalog.atomic_decrement_stock(id, quantity) {
                Ok(stock) => {
                    debug!(item_id = %id, taken = %quantity, stock = %stock, "stock decremented");
                    applied.push((id, quantity));
                }
                Err(err) => {
                    warn!(item_id = %id, error = %err, compensating = applied.len(), "stock decrement failed");
                    self.give_back(&applied);
                    return Err(match err {
                        StoreError::InsufficientStock { available } => {
                            insufficient(lookup, id, available, quantity).into()
                        }
                        other => other.into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Increment each item by its quantity. Failures are logged, not returned.
    fn give_back(&self, deltas: &[(ItemId, Quantity)]) {
        for (id, quantity) in deltas {
            match self.catalog.atomic_increment_stock(*id, *quantity) {
                Ok(stock) => {
                    debug!(item_id = %id, returned = %quantity, stock = %stock, "stock incremented")
                }
                Err(err) => {
                    error!(item_id = %id, quantity = %quantity, error = %err, "failed to return stock")
                }
            }
        }
    }

    /// Undo increments from an aborted release. Failures are logged, not returned.
    fn take_back(&self, deltas: &[(ItemId, Quantity)]) {
        for (id, quantity) in deltas {
            if let Err(err) = self.catalog.atomic_decrement_stock(*id, *quantity) {
                error!(item_id = %id, quantity = %quantity, error = %err, "failed to take back released stock");
            }
        }
    }
}

fn insufficient(
    lookup: &ItemLookup,
    id: ItemId,
    available: Quantity,
    required: Quantity,
) -> DomainError {
    DomainError::InsufficientStock {
        item_id: id,
        item_name: lookup
            .get(id)
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| id.to_string()),
        available,
        required,
    }
}

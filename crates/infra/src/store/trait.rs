use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use billbook_core::{CustomerId, DocumentId, DomainError, ItemId, Quantity};
use billbook_inventory::{CatalogItem, NewCatalogItem};
use billbook_invoicing::PricedDocument;
use billbook_parties::{Customer, CustomerDetails};

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// A unique key (document number, SKU) is already taken.
    #[error("unique constraint violation: {0}")]
    UniqueConstraintViolation(String),

    /// A conditional stock decrement found less than requested on hand.
    #[error("insufficient stock: {available} available")]
    InsufficientStock { available: Quantity },

    /// A domain rule refused a change the store was applying under its lock.
    #[error(transparent)]
    Rejected(DomainError),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Result of a batch catalog lookup.
///
/// `found` holds active items only; ids that exist but are deactivated land in
/// `inactive`, unknown ids in `missing`. Each list follows the order of the
/// requested ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemLookup {
    pub found: Vec<CatalogItem>,
    pub missing: Vec<ItemId>,
    pub inactive: Vec<ItemId>,
}

impl ItemLookup {
    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.found.iter().find(|item| item.id_typed() == id)
    }
}

/// Customer records.
///
/// Emails are unique among active customers: `insert` and `update_details`
/// fail with `UniqueConstraintViolation` when another active customer holds
/// the address. Deactivated customers release their email.
pub trait CustomerDirectory: Send + Sync {
    /// Fails with `NotFound` for unknown and deactivated customers alike.
    fn find_active_customer(&self, id: CustomerId) -> Result<Customer, StoreError>;

    fn insert(&self, customer: Customer) -> Result<(), StoreError>;

    /// Replace an active customer's details.
    fn update_details(&self, id: CustomerId, details: CustomerDetails) -> Result<Customer, StoreError>;

    fn deactivate(&self, id: CustomerId) -> Result<Customer, StoreError>;

    /// Active customers, ordered by name.
    fn list_active(&self) -> Result<Vec<Customer>, StoreError>;
}

/// Catalog items and their stock.
///
/// Stock moves only through the atomic primitives and `set_stock`, so the
/// store can serialize every change to a quantity.
pub trait Catalog: Send + Sync {
    fn get(&self, id: ItemId) -> Result<CatalogItem, StoreError>;

    fn find_active_items_by_ids(&self, ids: &[ItemId]) -> Result<ItemLookup, StoreError>;

    /// Decrement by `quantity` only if at least that much is on hand.
    ///
    /// Returns the remaining stock. The check and the write are one step.
    fn atomic_decrement_stock(&self, id: ItemId, quantity: Quantity) -> Result<Quantity, StoreError>;

    /// Returns the new stock.
    fn atomic_increment_stock(&self, id: ItemId, quantity: Quantity) -> Result<Quantity, StoreError>;

    /// Fails with `UniqueConstraintViolation` when the SKU is taken.
    fn insert(&self, item: CatalogItem) -> Result<(), StoreError>;

    /// Out-of-band stock correction.
    fn set_stock(&self, id: ItemId, quantity: Decimal) -> Result<CatalogItem, StoreError>;

    /// Replace descriptive and pricing fields, keeping stock.
    fn revise(&self, id: ItemId, input: NewCatalogItem) -> Result<CatalogItem, StoreError>;

    fn deactivate(&self, id: ItemId) -> Result<CatalogItem, StoreError>;

    fn list(&self) -> Result<Vec<CatalogItem>, StoreError>;
}

/// Persistence for one document family.
///
/// Document numbers are unique within the store: `insert` and `replace` fail
/// with `UniqueConstraintViolation` when another document holds the number.
pub trait DocumentStore<D: PricedDocument>: Send + Sync {
    fn load(&self, id: DocumentId) -> Result<D, StoreError>;

    fn insert(&self, doc: D) -> Result<(), StoreError>;

    fn replace(&self, doc: D) -> Result<(), StoreError>;

    fn delete(&self, id: DocumentId) -> Result<D, StoreError>;

    /// Every stored number starting with `prefix`.
    fn numbers_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn list(&self) -> Result<Vec<D>, StoreError>;
}

impl<S> CustomerDirectory for Arc<S>
where
    S: CustomerDirectory + ?Sized,
{
    fn find_active_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        (**self).find_active_customer(id)
    }

    fn insert(&self, customer: Customer) -> Result<(), StoreError> {
        (**self).insert(customer)
    }

    fn update_details(&self, id: CustomerId, details: CustomerDetails) -> Result<Customer, StoreError> {
        (**self).update_details(id, details)
    }

    fn deactivate(&self, id: CustomerId) -> Result<Customer, StoreError> {
        (**self).deactivate(id)
    }

    fn list_active(&self) -> Result<Vec<Customer>, StoreError> {
        (**self).list_active()
    }
}

impl<S> Catalog for Arc<S>
where
    S: Catalog + ?Sized,
{
    fn get(&self, id: ItemId) -> Result<CatalogItem, StoreError> {
        (**self).get(id)
    }

    fn find_active_items_by_ids(&self, ids: &[ItemId]) -> Result<ItemLookup, StoreError> {
        (**self).find_active_items_by_ids(ids)
    }

    fn atomic_decrement_stock(&self, id: ItemId, quantity: Quantity) -> Result<Quantity, StoreError> {
        (**self).atomic_decrement_stock(id, quantity)
    }

    fn atomic_increment_stock(&self, id: ItemId, quantity: Quantity) -> Result<Quantity, StoreError> {
        (**self).atomic_increment_stock(id, quantity)
    }

    fn insert(&self, item: CatalogItem) -> Result<(), StoreError> {
        (**self).insert(item)
    }

    fn set_stock(&self, id: ItemId, quantity: Decimal) -> Result<CatalogItem, StoreError> {
        (**self).set_stock(id, quantity)
    }

    fn revise(&self, id: ItemId, input: NewCatalogItem) -> Result<CatalogItem, StoreError> {
        (**self).revise(id, input)
    }

    fn deactivate(&self, id: ItemId) -> Result<CatalogItem, StoreError> {
        (**self).deactivate(id)
    }

    fn list(&self) -> Result<Vec<CatalogItem>, StoreError> {
        (**self).list()
    }
}

impl<D, S> DocumentStore<D> for Arc<S>
where
    D: PricedDocument,
    S: DocumentStore<D> + ?Sized,
{
    fn load(&self, id: DocumentId) -> Result<D, StoreError> {
        (**self).load(id)
    }

    fn insert(&self, doc: D) -> Result<(), StoreError> {
        (**self).insert(doc)
    }

    fn replace(&self, doc: D) -> Result<(), StoreError> {
        (**self).replace(doc)
    }

    fn delete(&self, id: DocumentId) -> Result<D, StoreError> {
        (**self).delete(id)
    }

    fn numbers_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).numbers_with_prefix(prefix)
    }

    fn list(&self) -> Result<Vec<D>, StoreError> {
        (**self).list()
    }
}

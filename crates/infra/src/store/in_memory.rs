use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use billbook_core::{CustomerId, DocumentId, DomainResult, Entity, ItemId, Quantity};
use billbook_inventory::{normalize_sku, CatalogItem, NewCatalogItem};
use billbook_invoicing::PricedDocument;
use billbook_parties::{Customer, CustomerDetails};

use super::r#trait::{Catalog, CustomerDirectory, DocumentStore, ItemLookup, StoreError};

/// In-memory customer directory.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomers {
    inner: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change one active customer on a copy; the email check and the write
    /// happen under the same lock.
    fn modify(
        &self,
        id: CustomerId,
        change: impl FnOnce(&mut Customer) -> DomainResult<()>,
    ) -> Result<Customer, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = map
            .get(&id)
            .filter(|c| c.is_active())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("customer {id}")))?;
        change(&mut next).map_err(StoreError::Rejected)?;
        if next.is_active() && email_taken(&map, next.email(), Some(id)) {
            return Err(StoreError::UniqueConstraintViolation(format!(
                "email {}",
                next.email()
            )));
        }
        map.insert(id, next.clone());
        Ok(next)
    }
}

fn email_taken(map: &HashMap<CustomerId, Customer>, email: &str, except: Option<CustomerId>) -> bool {
    map.values()
        .any(|c| c.is_active() && c.email() == email && Some(c.id_typed()) != except)
}

impl CustomerDirectory for InMemoryCustomers {
    fn find_active_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        map.get(&id)
            .filter(|c| c.is_active())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("customer {id}")))
    }

    fn insert(&self, customer: Customer) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if email_taken(&map, customer.email(), None) {
            return Err(StoreError::UniqueConstraintViolation(format!(
                "email {}",
                customer.email()
            )));
        }
        if map.contains_key(customer.id()) {
            return Err(StoreError::UniqueConstraintViolation(format!(
                "customer {}",
                customer.id_typed()
            )));
        }
        map.insert(customer.id_typed(), customer);
        Ok(())
    }

    fn update_details(&self, id: CustomerId, details: CustomerDetails) -> Result<Customer, StoreError> {
        self.modify(id, |customer| customer.update_details(details))
    }

    fn deactivate(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.modify(id, Customer::deactivate)
    }

    fn list_active(&self) -> Result<Vec<Customer>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut out: Vec<_> = map.values().filter(|c| c.is_active()).cloned().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(out)
    }
}

/// In-memory catalog.
///
/// Every stock change runs under the write lock, which is what makes the
/// conditional decrement atomic with respect to concurrent reservations.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<ItemId, CatalogItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify(
        &self,
        id: ItemId,
        change: impl FnOnce(&mut CatalogItem) -> DomainResult<()>,
    ) -> Result<CatalogItem, StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;
        apply(&mut items, id, change)
    }
}

/// Change one item on a copy, so a refused change leaves the stored item intact.
fn apply(
    items: &mut HashMap<ItemId, CatalogItem>,
    id: ItemId,
    change: impl FnOnce(&mut CatalogItem) -> DomainResult<()>,
) -> Result<CatalogItem, StoreError> {
    let item = items
        .get_mut(&id)
        .ok_or_else(|| StoreError::NotFound(format!("item {id}")))?;
    let mut next = item.clone();
    change(&mut next).map_err(StoreError::Rejected)?;
    *item = next.clone();
    Ok(next)
}

fn sku_taken(items: &HashMap<ItemId, CatalogItem>, sku: &str, except: Option<ItemId>) -> bool {
    items
        .values()
        .any(|i| i.sku() == sku && Some(i.id_typed()) != except)
}

impl Catalog for InMemoryCatalog {
    fn get(&self, id: ItemId) -> Result<CatalogItem, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::Poisoned)?;
        items
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("item {id}")))
    }

    fn find_active_items_by_ids(&self, ids: &[ItemId]) -> Result<ItemLookup, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::Poisoned)?;
        let mut lookup = ItemLookup::default();
        for id in ids {
            match items.get(id) {
                Some(item) if item.is_active() => lookup.found.push(item.clone()),
                Some(_) => lookup.inactive.push(*id),
                None => lookup.missing.push(*id),
            }
        }
        Ok(lookup)
    }

    fn atomic_decrement_stock(&self, id: ItemId, quantity: Quantity) -> Result<Quantity, StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("item {id}")))?;
        item.take_stock(quantity)
            .map_err(|_| StoreError::InsufficientStock {
                available: item.stock_quantity(),
            })?;
        Ok(item.stock_quantity())
    }

    fn atomic_increment_stock(&self, id: ItemId, quantity: Quantity) -> Result<Quantity, StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("item {id}")))?;
        item.return_stock(quantity).map_err(StoreError::Rejected)?;
        Ok(item.stock_quantity())
    }

    fn insert(&self, item: CatalogItem) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;
        if sku_taken(&items, item.sku(), None) {
            return Err(StoreError::UniqueConstraintViolation(format!(
                "sku {}",
                item.sku()
            )));
        }
        if items.contains_key(item.id()) {
            return Err(StoreError::UniqueConstraintViolation(format!(
                "item {}",
                item.id_typed()
            )));
        }
        items.insert(item.id_typed(), item);
        Ok(())
    }

    fn set_stock(&self, id: ItemId, quantity: Decimal) -> Result<CatalogItem, StoreError> {
        self.modify(id, |item| item.correct_stock(quantity))
    }

    fn revise(&self, id: ItemId, input: NewCatalogItem) -> Result<CatalogItem, StoreError> {
        let sku = normalize_sku(&input.sku);
        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;
        if sku_taken(&items, &sku, Some(id)) {
            return Err(StoreError::UniqueConstraintViolation(format!("sku {sku}")));
        }
        apply(&mut items, id, |item| item.revise(input))
    }

    fn deactivate(&self, id: ItemId) -> Result<CatalogItem, StoreError> {
        self.modify(id, CatalogItem::deactivate)
    }

    fn list(&self) -> Result<Vec<CatalogItem>, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::Poisoned)?;
        let mut out: Vec<_> = items.values().cloned().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(out)
    }
}

#[derive(Debug)]
struct Documents<D> {
    by_id: HashMap<DocumentId, D>,
    numbers: HashMap<String, DocumentId>,
}

impl<D> Default for Documents<D> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            numbers: HashMap::new(),
        }
    }
}

/// In-memory document store with a unique index on the document number.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D> {
    inner: RwLock<Documents<D>>,
}

impl<D> InMemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Documents::default()),
        }
    }
}

impl<D> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_number<D: PricedDocument>(number: &str) -> StoreError {
    StoreError::UniqueConstraintViolation(format!("{} number {number}", D::KIND.label()))
}

impl<D: PricedDocument> DocumentStore<D> for InMemoryDocumentStore<D> {
    fn load(&self, id: DocumentId) -> Result<D, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        inner
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {id}", D::KIND.label())))
    }

    fn insert(&self, doc: D) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.numbers.contains_key(doc.number()) {
            return Err(duplicate_number::<D>(doc.number()));
        }
        if inner.by_id.contains_key(doc.id()) {
            return Err(StoreError::UniqueConstraintViolation(format!(
                "{} {}",
                D::KIND.label(),
                doc.id()
            )));
        }
        inner.numbers.insert(doc.number().to_string(), *doc.id());
        inner.by_id.insert(*doc.id(), doc);
        Ok(())
    }

    fn replace(&self, doc: D) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let id = *doc.id();
        let previous_number = inner
            .by_id
            .get(&id)
            .map(|d| d.number().to_string())
            .ok_or_else(|| StoreError::NotFound(format!("{} {id}", D::KIND.label())))?;

        if let Some(holder) = inner.numbers.get(doc.number()) {
            if *holder != id {
                return Err(duplicate_number::<D>(doc.number()));
            }
        }

        inner.numbers.remove(&previous_number);
        inner.numbers.insert(doc.number().to_string(), id);
        inner.by_id.insert(id, doc);
        Ok(())
    }

    fn delete(&self, id: DocumentId) -> Result<D, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let doc = inner
            .by_id
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("{} {id}", D::KIND.label())))?;
        inner.numbers.remove(doc.number());
        Ok(doc)
    }

    fn numbers_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .numbers
            .keys()
            .filter(|n| n.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<D>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut docs: Vec<D> = inner.by_id.values().cloned().collect();
        docs.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::{DomainError, UserId};
    use billbook_inventory::ItemUnit;
    use billbook_invoicing::{Invoice, InvoiceChanges, InvoiceDraft, LineItem};
    use billbook_parties::{Address, CustomerDetails};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn item(sku: &str, stock: Decimal) -> CatalogItem {
        CatalogItem::register(
            ItemId::new(),
            NewCatalogItem {
                name: format!("Item {sku}"),
                description: None,
                sku: sku.to_string(),
                price: dec!(10),
                cost: dec!(4),
                category: "General".to_string(),
                unit: ItemUnit::Piece,
                min_stock_level: dec!(0),
                tax_rate: dec!(0),
            },
            stock,
            Utc::now(),
        )
        .unwrap()
    }

    fn invoice(number: &str) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        Invoice::issue(
            DocumentId::new(),
            number.to_string(),
            InvoiceDraft {
                number: None,
                customer_id: CustomerId::new(),
                quotation_id: None,
                lines: vec![LineItem::new(ItemId::new(), dec!(1), dec!(5), None, None).unwrap()],
                issue_date: date,
                due_date: date,
                payment_method: None,
                notes: None,
                terms: None,
                created_by: UserId::new(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn details(email: &str) -> CustomerDetails {
        CustomerDetails {
            name: "Acme".to_string(),
            email: email.to_string(),
            phone: "+15550100".to_string(),
            address: Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: "US".to_string(),
            },
        }
    }

    fn customer(email: &str) -> Customer {
        Customer::register(CustomerId::new(), details(email), Utc::now()).unwrap()
    }

    #[test]
    fn inactive_customers_are_not_found() {
        let store = InMemoryCustomers::new();
        let customer = customer("billing@acme.test");
        let id = customer.id_typed();
        store.insert(customer).unwrap();
        assert!(store.find_active_customer(id).is_ok());

        store.deactivate(id).unwrap();
        assert!(matches!(
            store.find_active_customer(id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.deactivate(id), Err(StoreError::NotFound(_))));
        assert!(store.list_active().unwrap().is_empty());
    }

    #[test]
    fn active_emails_are_unique() {
        let store = InMemoryCustomers::new();
        let first = customer("billing@acme.test");
        let first_id = first.id_typed();
        store.insert(first).unwrap();

        assert!(matches!(
            store.insert(customer("Billing@Acme.test")),
            Err(StoreError::UniqueConstraintViolation(_))
        ));

        let second = customer("ap@globex.test");
        let second_id = second.id_typed();
        store.insert(second).unwrap();
        assert!(matches!(
            store.update_details(second_id, details("billing@acme.test")),
            Err(StoreError::UniqueConstraintViolation(_))
        ));
        assert_eq!(
            store.find_active_customer(second_id).unwrap().email(),
            "ap@globex.test"
        );

        // Keeping your own email is fine; a deactivated holder frees it.
        store.update_details(first_id, details("billing@acme.test")).unwrap();
        store.deactivate(first_id).unwrap();
        store.insert(customer("billing@acme.test")).unwrap();
    }

    #[test]
    fn lookup_partitions_ids() {
        let catalog = InMemoryCatalog::new();
        let active = item("A-1", dec!(5));
        let inactive = item("B-1", dec!(5));
        let (a, b, unknown) = (active.id_typed(), inactive.id_typed(), ItemId::new());
        catalog.insert(active).unwrap();
        catalog.insert(inactive).unwrap();
        catalog.deactivate(b).unwrap();

        let lookup = catalog.find_active_items_by_ids(&[a, b, unknown]).unwrap();
        assert_eq!(lookup.found.len(), 1);
        assert!(lookup.get(a).is_some());
        assert_eq!(lookup.inactive, vec![b]);
        assert_eq!(lookup.missing, vec![unknown]);
    }

    #[test]
    fn decrement_is_conditional() {
        let catalog = InMemoryCatalog::new();
        let it = item("A-1", dec!(10));
        let id = it.id_typed();
        catalog.insert(it).unwrap();

        assert_eq!(
            catalog.atomic_decrement_stock(id, Quantity::new(dec!(6))).unwrap(),
            Quantity::new(dec!(4))
        );
        assert_eq!(
            catalog.atomic_decrement_stock(id, Quantity::new(dec!(6))),
            Err(StoreError::InsufficientStock {
                available: Quantity::new(dec!(4))
            })
        );
        assert_eq!(
            catalog.atomic_increment_stock(id, Quantity::new(dec!(6))).unwrap(),
            Quantity::new(dec!(10))
        );
    }

    #[test]
    fn sku_is_unique_case_insensitively() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(item("bolt-1", dec!(1))).unwrap();
        assert!(matches!(
            catalog.insert(item(" BOLT-1 ", dec!(1))),
            Err(StoreError::UniqueConstraintViolation(_))
        ));
    }

    #[test]
    fn refused_change_keeps_item() {
        let catalog = InMemoryCatalog::new();
        let it = item("A-1", dec!(3));
        let id = it.id_typed();
        catalog.insert(it).unwrap();

        let err = catalog.set_stock(id, dec!(-1)).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(DomainError::InvalidInput(_))));
        assert_eq!(catalog.get(id).unwrap().stock_quantity(), Quantity::new(dec!(3)));
    }

    #[test]
    fn document_numbers_are_unique() {
        let store = InMemoryDocumentStore::<Invoice>::new();
        store.insert(invoice("INV-2026-0001")).unwrap();
        assert!(matches!(
            store.insert(invoice("INV-2026-0001")),
            Err(StoreError::UniqueConstraintViolation(_))
        ));
    }

    #[test]
    fn replace_moves_number_index() {
        let store = InMemoryDocumentStore::<Invoice>::new();
        let first = invoice("INV-2026-0001");
        let second = invoice("INV-2026-0002");
        store.insert(first.clone()).unwrap();
        store.insert(second.clone()).unwrap();

        let mut clash = first.clone();
        clash
            .apply_changes(
                InvoiceChanges {
                    number: Some("INV-2026-0002".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(matches!(
            store.replace(clash),
            Err(StoreError::UniqueConstraintViolation(_))
        ));

        let mut numbers = store.numbers_with_prefix("INV-2026-").unwrap();
        numbers.sort();
        assert_eq!(numbers, vec!["INV-2026-0001", "INV-2026-0002"]);

        store.delete(*second.id()).unwrap();
        assert_eq!(store.numbers_with_prefix("INV-").unwrap(), vec!["INV-2026-0001"]);
        assert!(matches!(
            store.load(*second.id()),
            Err(StoreError::NotFound(_))
        ));
    }
}

//! Application services: the request-level operations on documents, customers
//! and the catalog.
//!
//! Each operation validates, moves stock through the
//! [`ReservationCoordinator`](crate::reservation::ReservationCoordinator),
//! then persists. A failure at any step undoes the stock movement of the
//! earlier steps, so an operation either takes full effect or none.

mod catalog;
mod customers;
mod invoices;
mod quotations;

pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use invoices::InvoiceService;
pub use quotations::QuotationService;

use billbook_core::{CustomerId, DomainError};
use billbook_invoicing::{DocumentNumber, PricedDocument};
use thiserror::Error;

use crate::store::{CustomerDirectory, DocumentStore, StoreError};

/// Failure of a service operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Deterministic business-rule failure.
    #[error(transparent)]
    Domain(DomainError),

    /// Storage failure not attributable to input.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Store(_) => None,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::Domain(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => ServiceError::Domain(DomainError::NotFound(what)),
            StoreError::UniqueConstraintViolation(key) => {
                ServiceError::Domain(DomainError::DuplicateNumber(key))
            }
            StoreError::Rejected(e) => ServiceError::Domain(e),
            other => ServiceError::Store(other),
        }
    }
}

/// Persist a new document under `requested` or, when absent, the next free
/// number for `prefix`/`year`.
///
/// Generated numbers are retried on a collision up to `attempts` times; a
/// caller-chosen number is tried once.
pub(crate) fn insert_numbered<D, S>(
    store: &S,
    requested: Option<String>,
    prefix: &str,
    year: i32,
    attempts: u32,
    build: impl Fn(String) -> Result<D, DomainError>,
) -> ServiceResult<D>
where
    D: PricedDocument,
    S: DocumentStore<D>,
{
    if let Some(number) = requested {
        let doc = build(number)?;
        store.insert(doc.clone())?;
        return Ok(doc);
    }

    let mut last = String::new();
    for attempt in 1..=attempts.max(1) {
        let number = next_number::<D, S>(store, prefix, year)?;
        let doc = build(number.clone())?;
        match store.insert(doc.clone()) {
            Ok(()) => return Ok(doc),
            Err(StoreError::UniqueConstraintViolation(_)) => {
                tracing::debug!(%number, attempt, "document number taken, retrying");
                last = number;
            }
            Err(other) => return Err(other.into()),
        }
    }
    tracing::warn!(%last, attempts, "gave up generating a document number");
    Err(DomainError::DuplicateNumber(last).into())
}

pub(crate) fn next_number<D, S>(store: &S, prefix: &str, year: i32) -> ServiceResult<String>
where
    D: PricedDocument,
    S: DocumentStore<D>,
{
    let existing = store.numbers_with_prefix(&DocumentNumber::year_prefix(prefix, year))?;
    Ok(DocumentNumber::next_in_sequence(prefix, year, existing.iter().map(String::as_str)).to_string())
}

/// Documents may only be issued to active customers.
pub(crate) fn ensure_customer<P: CustomerDirectory>(customers: &P, id: CustomerId) -> ServiceResult<()> {
    match customers.find_active_customer(id) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => Err(DomainError::CustomerNotFound.into()),
        Err(other) => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::Quantity;

    #[test]
    fn store_errors_map_to_domain_kinds() {
        assert_eq!(
            ServiceError::from(StoreError::UniqueConstraintViolation("INV-2026-0001".into())),
            ServiceError::Domain(DomainError::DuplicateNumber("INV-2026-0001".into()))
        );
        assert_eq!(
            ServiceError::from(StoreError::NotFound("invoice x".into())),
            ServiceError::Domain(DomainError::NotFound("invoice x".into()))
        );
        assert!(matches!(
            ServiceError::from(StoreError::InsufficientStock {
                available: Quantity::ZERO
            }),
            ServiceError::Store(_)
        ));
        assert!(ServiceError::from(StoreError::Poisoned).domain().is_none());
    }
}

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, instrument};

use billbook_core::DocumentId;
use billbook_invoicing::{
    DocumentNumber, PricedDocument, Quotation, QuotationChanges, QuotationDraft, QuotationStatus,
};

use crate::config::BillingConfig;
use crate::reservation::ReservationCoordinator;
use crate::store::{Catalog, CustomerDirectory, DocumentStore};

use super::{ensure_customer, insert_numbered, next_number, ServiceResult};

/// Quotation operations. Quotations check their items but never hold stock.
#[derive(Debug)]
pub struct QuotationService<P, C, Q> {
    customers: P,
    reservations: ReservationCoordinator<C>,
    quotations: Q,
    config: BillingConfig,
}

impl<P, C, Q> QuotationService<P, C, Q> {
    pub fn new(customers: P, catalog: C, quotations: Q, config: BillingConfig) -> Self {
        Self {
            customers,
            reservations: ReservationCoordinator::new(catalog),
            quotations,
            config,
        }
    }
}

impl<P, C, Q> QuotationService<P, C, Q>
where
    P: CustomerDirectory,
    C: Catalog,
    Q: DocumentStore<Quotation>,
{
    pub fn get(&self, id: DocumentId) -> ServiceResult<Quotation> {
        Ok(self.quotations.load(id)?)
    }

    #[instrument(skip(self, draft, now), fields(customer_id = %draft.customer_id), err)]
    pub fn create(&self, draft: QuotationDraft, now: DateTime<Utc>) -> ServiceResult<Quotation> {
        ensure_customer(&self.customers, draft.customer_id)?;
        self.reservations.verify_items(&draft.lines)?;

        let id = DocumentId::new();
        let prefix = self.config.quotation_prefix.as_str();
        let probe_number = draft
            .number
            .clone()
            .unwrap_or_else(|| DocumentNumber::new(prefix, now.year(), 1).to_string());
        Quotation::issue(id, probe_number, draft.clone(), now)?;

        let quotation = insert_numbered::<Quotation, Q>(
            &self.quotations,
            draft.number.clone(),
            prefix,
            now.year(),
            self.config.number_retry_attempts,
            |number| Quotation::issue(id, number, draft.clone(), now),
        )?;
        info!(quotation_id = %id, number = quotation.number(), total = %quotation.totals().total, "quotation created");
        Ok(quotation)
    }

    #[instrument(skip(self, changes, now), err)]
    pub fn update(
        &self,
        id: DocumentId,
        changes: QuotationChanges,
        now: DateTime<Utc>,
    ) -> ServiceResult<Quotation> {
        let mut quotation = self.quotations.load(id)?;
        if let Some(customer_id) = changes.customer_id {
            ensure_customer(&self.customers, customer_id)?;
        }
        if let Some(lines) = &changes.lines {
            self.reservations.verify_items(lines)?;
        }

        quotation.apply_changes(changes, now)?;
        self.quotations.replace(quotation.clone())?;
        info!(quotation_id = %id, number = quotation.number(), "quotation updated");
        Ok(quotation)
    }

    #[instrument(skip(self, now), err)]
    pub fn change_status(
        &self,
        id: DocumentId,
        status: QuotationStatus,
        now: DateTime<Utc>,
    ) -> ServiceResult<Quotation> {
        let mut quotation = self.quotations.load(id)?;
        quotation.change_status(status, now);
        self.quotations.replace(quotation.clone())?;
        info!(quotation_id = %id, status = ?status, "quotation status changed");
        Ok(quotation)
    }

    #[instrument(skip(self), err)]
    pub fn delete(&self, id: DocumentId) -> ServiceResult<Quotation> {
        let deleted = self.quotations.delete(id)?;
        info!(quotation_id = %id, number = deleted.number(), "quotation deleted");
        Ok(deleted)
    }

    pub fn next_number(&self, now: DateTime<Utc>) -> ServiceResult<String> {
        next_number::<Quotation, Q>(&self.quotations, &self.config.quotation_prefix, now.year())
    }
}

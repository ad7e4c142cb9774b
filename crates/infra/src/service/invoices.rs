use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use tracing::{error, info, instrument};

use billbook_core::{DocumentId, DomainError, UserId};
use billbook_invoicing::{
    DocumentNumber, Invoice, InvoiceChanges, InvoiceDraft, InvoiceStatus, LineItem, Payment,
    PaymentReceipt, PricedDocument, Quotation,
};

use crate::config::BillingConfig;
use crate::reservation::ReservationCoordinator;
use crate::store::{Catalog, CustomerDirectory, DocumentStore, StoreError};

use super::{ensure_customer, insert_numbered, next_number, ServiceResult};

/// Invoice operations. Invoices hold stock for their lines from creation
/// until they are cancelled or deleted.
#[derive(Debug)]
pub struct InvoiceService<P, C, I, Q> {
    customers: P,
    reservations: ReservationCoordinator<C>,
    invoices: I,
    quotations: Q,
    config: BillingConfig,
}

impl<P, C, I, Q> InvoiceService<P, C, I, Q> {
    pub fn new(customers: P, catalog: C, invoices: I, quotations: Q, config: BillingConfig) -> Self {
        Self {
            customers,
            reservations: ReservationCoordinator::new(catalog),
            invoices,
            quotations,
            config,
        }
    }
}

impl<P, C, I, Q> InvoiceService<P, C, I, Q>
where
    P: CustomerDirectory,
    C: Catalog,
    I: DocumentStore<Invoice>,
    Q: DocumentStore<Quotation>,
{
    pub fn get(&self, id: DocumentId) -> ServiceResult<Invoice> {
        Ok(self.invoices.load(id)?)
    }

    /// Issue an invoice and reserve stock for its lines.
    #[instrument(skip(self, draft, now), fields(customer_id = %draft.customer_id), err)]
    pub fn create(&self, draft: InvoiceDraft, now: DateTime<Utc>) -> ServiceResult<Invoice> {
        ensure_customer(&self.customers, draft.customer_id)?;
        if let Some(quotation_id) = draft.quotation_id {
            self.ensure_quotation(quotation_id)?;
        }

        // Full validation before any stock moves.
        let id = DocumentId::new();
        let prefix = self.config.invoice_prefix.as_str();
        let probe_number = draft
            .number
            .clone()
            .unwrap_or_else(|| DocumentNumber::new(prefix, now.year(), 1).to_string());
        Invoice::issue(id, probe_number, draft.clone(), now)?;

        self.reservations.reserve(&draft.lines)?;

        let created = insert_numbered::<Invoice, I>(
            &self.invoices,
            draft.number.clone(),
            prefix,
            now.year(),
            self.config.number_retry_attempts,
            |number| Invoice::issue(id, number, draft.clone(), now),
        );
        match created {
            Ok(invoice) => {
                info!(invoice_id = %id, number = invoice.number(), total = %invoice.totals().total, "invoice created");
                Ok(invoice)
            }
            Err(err) => {
                self.return_stock(&draft.lines);
                Err(err)
            }
        }
    }

    /// Invoice a quotation's lines, due `default_due_days` after today.
    #[instrument(skip(self, number, created_by, now), err)]
    pub fn create_from_quotation(
        &self,
        quotation_id: DocumentId,
        number: Option<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invoice> {
        let quotation = self.quotations.load(quotation_id)?;
        let today = now.date_naive();
        let due_date = today
            .checked_add_days(Days::new(u64::from(self.config.default_due_days)))
            .ok_or_else(|| DomainError::invalid("due date out of range"))?;

        let mut draft = Invoice::draft_from_quotation(&quotation, today, due_date, created_by)?;
        draft.number = number;
        self.create(draft, now)
    }

    /// Apply a partial update. Changed lines move stock by the net
    /// difference; if that fails the invoice keeps its old lines.
    #[instrument(skip(self, changes, now), err)]
    pub fn update(
        &self,
        id: DocumentId,
        changes: InvoiceChanges,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invoice> {
        let current = self.invoices.load(id)?;
        if let Some(customer_id) = changes.customer_id {
            ensure_customer(&self.customers, customer_id)?;
        }
        if let Some(quotation_id) = changes.quotation_id {
            self.ensure_quotation(quotation_id)?;
        }

        let lines_changed = changes.touches_lines();
        let mut next = current.clone();
        next.apply_changes(changes, now)?;

        if lines_changed {
            self.reservations.re_reserve(current.lines(), next.lines())?;
        }

        if let Err(err) = self.invoices.replace(next.clone()) {
            if lines_changed {
                self.restore_lines(next.lines(), current.lines());
            }
            return Err(err.into());
        }
        info!(invoice_id = %id, number = next.number(), total = %next.totals().total, "invoice updated");
        Ok(next)
    }

    #[instrument(skip(self, payment, now), fields(amount = %payment.amount), err)]
    pub fn record_payment(
        &self,
        id: DocumentId,
        payment: Payment,
        now: DateTime<Utc>,
    ) -> ServiceResult<(Invoice, PaymentReceipt)> {
        let mut invoice = self.invoices.load(id)?;
        let receipt = invoice.record_payment(payment, now)?;
        self.invoices.replace(invoice.clone())?;
        info!(
            invoice_id = %id,
            balance_due = %receipt.balance_due,
            payment_status = ?receipt.payment_status,
            "payment recorded"
        );
        Ok((invoice, receipt))
    }

    /// Change the status. Cancelling returns the invoice's stock.
    #[instrument(skip(self, now), err)]
    pub fn change_status(
        &self,
        id: DocumentId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invoice> {
        let current = self.invoices.load(id)?;
        let mut next = current.clone();
        next.change_status(status, now)?;

        let cancelling = !current.is_cancelled() && next.is_cancelled();
        if cancelling {
            self.reservations.release(current.lines())?;
        }

        if let Err(err) = self.invoices.replace(next.clone()) {
            if cancelling {
                self.retake_stock(current.lines());
            }
            return Err(err.into());
        }
        info!(invoice_id = %id, status = ?status, "invoice status changed");
        Ok(next)
    }

    /// Delete an invoice, returning its stock unless it was cancelled.
    ///
    /// Paid invoices are locked.
    #[instrument(skip(self), err)]
    pub fn delete(&self, id: DocumentId) -> ServiceResult<Invoice> {
        let current = self.invoices.load(id)?;
        current.ensure_not_locked()?;

        let holds_stock = !current.is_cancelled();
        if holds_stock {
            self.reservations.release(current.lines())?;
        }

        match self.invoices.delete(id) {
            Ok(deleted) => {
                info!(invoice_id = %id, number = deleted.number(), "invoice deleted");
                Ok(deleted)
            }
            Err(err) => {
                if holds_stock {
                    self.retake_stock(current.lines());
                }
                Err(err.into())
            }
        }
    }

    /// Next free number for the year of `now`.
    pub fn next_number(&self, now: DateTime<Utc>) -> ServiceResult<String> {
        next_number::<Invoice, I>(&self.invoices, &self.config.invoice_prefix, now.year())
    }

    /// Unpaid, uncancelled invoices past due on `today`, oldest due first.
    pub fn overdue(&self, today: NaiveDate) -> ServiceResult<Vec<Invoice>> {
        let mut overdue: Vec<Invoice> = self
            .invoices
            .list()?
            .into_iter()
            .filter(|inv| inv.is_overdue(today))
            .collect();
        overdue.sort_by_key(|inv| inv.due_date());
        Ok(overdue)
    }

    /// An invoice may only reference a quotation that exists.
    fn ensure_quotation(&self, id: DocumentId) -> ServiceResult<()> {
        match self.quotations.load(id) {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(DomainError::not_found("quotation").into()),
            Err(other) => Err(other.into()),
        }
    }

    fn return_stock(&self, lines: &[LineItem]) {
        if let Err(err) = self.reservations.release(lines) {
            error!(error = %err, "failed to release reservation after aborted create");
        }
    }

    fn retake_stock(&self, lines: &[LineItem]) {
        if let Err(err) = self.reservations.reserve(lines) {
            error!(error = %err, "failed to restore reservation after aborted release");
        }
    }

    fn restore_lines(&self, applied: &[LineItem], original: &[LineItem]) {
        if let Err(err) = self.reservations.re_reserve(applied, original) {
            error!(error = %err, "failed to restore reservation after aborted update");
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{CustomerId, DocumentId, DomainError, DomainResult, Entity, Money, UserId};

use crate::document::{validate_number, validate_text, PricedDocument};
use crate::line::LineItem;
use crate::numbering::DocumentKind;
use crate::pricing::{compute_totals, Totals};
use crate::quotation::Quotation;

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

/// Settlement state, derived from `amount_paid` and the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    CreditCard,
    #[default]
    BankTransfer,
    Other,
}

/// Input for issuing an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    #[serde(default)]
    pub number: Option<String>,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub quotation_id: Option<DocumentId>,
    pub lines: Vec<LineItem>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    pub created_by: UserId,
}

/// Partial update. `None` leaves a field unchanged.
///
/// Status moves through [`Invoice::change_status`] since cancellation has a
/// stock side effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceChanges {
    pub number: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub quotation_id: Option<DocumentId>,
    pub lines: Option<Vec<LineItem>>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

impl InvoiceChanges {
    /// Whether applying these changes alters what the customer owes.
    pub fn touches_lines(&self) -> bool {
        self.lines.is_some()
    }

    /// Whether these changes alter who is billed or under which number.
    pub fn touches_billing(&self) -> bool {
        self.number.is_some() || self.customer_id.is_some() || self.quotation_id.is_some()
    }
}

/// A single payment against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: Decimal,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// What a recorded payment did to the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub amount: Money,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub balance_due: Money,
    pub payment_status: PaymentStatus,
}

/// A billed document. Its lines hold stock for as long as it is not cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: DocumentId,
    number: String,
    customer_id: CustomerId,
    quotation_id: Option<DocumentId>,
    lines: Vec<LineItem>,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    status: InvoiceStatus,
    payment_method: PaymentMethod,
    amount_paid: Money,
    notes: Option<String>,
    terms: Option<String>,
    totals: Totals,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn ensure_due_after_issue(issue_date: NaiveDate, due_date: NaiveDate) -> DomainResult<()> {
    if due_date < issue_date {
        return Err(DomainError::invalid("due date cannot be before issue date"));
    }
    Ok(())
}

impl Invoice {
    /// Build a draft invoice with totals derived from `draft.lines`.
    pub fn issue(
        id: DocumentId,
        number: String,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_due_after_issue(draft.issue_date, draft.due_date)?;
        let totals = compute_totals(&draft.lines)?;

        Ok(Self {
            id,
            number: validate_number(number)?,
            customer_id: draft.customer_id,
            quotation_id: draft.quotation_id,
            lines: draft.lines,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            status: InvoiceStatus::Draft,
            payment_method: draft.payment_method.unwrap_or_default(),
            amount_paid: Money::ZERO,
            notes: validate_text("notes", draft.notes)?,
            terms: validate_text("terms", draft.terms)?,
            totals,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Draft built from a quotation's customer, lines, notes and terms.
    pub fn draft_from_quotation(
        quotation: &Quotation,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        created_by: UserId,
    ) -> DomainResult<InvoiceDraft> {
        if !quotation.can_convert_to_invoice() {
            return Err(DomainError::invariant(format!(
                "quotation {} cannot be converted in status {:?}",
                quotation.number(),
                quotation.status()
            )));
        }
        if quotation.is_expired(issue_date) {
            return Err(DomainError::invariant(format!(
                "quotation {} expired on {}",
                quotation.number(),
                quotation.valid_until()
            )));
        }
        Ok(InvoiceDraft {
            number: None,
            customer_id: quotation.customer_id(),
            quotation_id: Some(quotation.id_typed()),
            lines: quotation.lines().to_vec(),
            issue_date,
            due_date,
            payment_method: None,
            notes: quotation.notes().map(str::to_string),
            terms: quotation.terms().map(str::to_string),
            created_by,
        })
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn quotation_id(&self) -> Option<DocumentId> {
        self.quotation_id
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn terms(&self) -> Option<&str> {
        self.terms.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn balance_due(&self) -> Money {
        self.totals.total - self.amount_paid
    }

    /// Nothing paid is `Unpaid` (even for a zero total); paid in full or more
    /// is `Paid`; anything between is `Partial`.
    pub fn payment_status(&self) -> PaymentStatus {
        if self.amount_paid.is_zero() {
            PaymentStatus::Unpaid
        } else if self.amount_paid >= self.totals.total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status() == PaymentStatus::Paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InvoiceStatus::Cancelled
    }

    /// Past due on `today`, not settled and not cancelled.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && !self.is_paid() && !self.is_cancelled()
    }

    /// Paid invoices keep their lines, billing details and existence.
    pub fn ensure_not_locked(&self) -> DomainResult<()> {
        if self.is_paid() {
            return Err(DomainError::locked(format!(
                "invoice {} is paid",
                self.number
            )));
        }
        Ok(())
    }

    /// Apply a partial update. Nothing changes unless every field validates.
    ///
    /// Line, number, customer and quotation changes are refused on paid
    /// invoices (`DocumentLocked`). Line changes are also refused on cancelled
    /// invoices, whose stock has already gone back.
    pub fn apply_changes(&mut self, changes: InvoiceChanges, now: DateTime<Utc>) -> DomainResult<()> {
        if changes.touches_lines() || changes.touches_billing() {
            self.ensure_not_locked()?;
        }
        if changes.touches_lines() {
            if self.is_cancelled() {
                return Err(DomainError::invariant(format!(
                    "invoice {} is cancelled",
                    self.number
                )));
            }
        }

        let mut next = self.clone();

        if let Some(number) = changes.number {
            next.number = validate_number(number)?;
        }
        if let Some(customer_id) = changes.customer_id {
            next.customer_id = customer_id;
        }
        if let Some(quotation_id) = changes.quotation_id {
            next.quotation_id = Some(quotation_id);
        }
        if let Some(due_date) = changes.due_date {
            ensure_due_after_issue(next.issue_date, due_date)?;
            next.due_date = due_date;
        }
        if let Some(method) = changes.payment_method {
            next.payment_method = method;
        }
        if changes.notes.is_some() {
            next.notes = validate_text("notes", changes.notes)?;
        }
        if changes.terms.is_some() {
            next.terms = validate_text("terms", changes.terms)?;
        }
        if let Some(lines) = changes.lines {
            let totals = compute_totals(&lines)?;
            if totals.total < next.amount_paid {
                return Err(DomainError::invalid(format!(
                    "new total {} is below amount already paid {}",
                    totals.total, next.amount_paid
                )));
            }
            next.totals = totals;
            next.lines = lines;
        }

        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Add a payment. The amount must be positive and within the balance due.
    pub fn record_payment(&mut self, payment: Payment, now: DateTime<Utc>) -> DomainResult<PaymentReceipt> {
        if self.is_cancelled() {
            return Err(DomainError::invariant(format!(
                "cannot record a payment on cancelled invoice {}",
                self.number
            )));
        }
        if payment.amount <= Decimal::ZERO {
            return Err(DomainError::invalid("payment amount must be greater than 0"));
        }

        let amount = Money::new(payment.amount);
        let balance_due = self.balance_due();
        if amount > balance_due {
            return Err(DomainError::PaymentExceedsTotal {
                amount,
                balance_due,
            });
        }
        let notes = validate_text("notes", payment.notes)?;

        self.amount_paid += amount;
        if let Some(method) = payment.method {
            self.payment_method = method;
        }
        self.updated_at = now;

        Ok(PaymentReceipt {
            amount,
            method: self.payment_method,
            notes,
            balance_due: self.balance_due(),
            payment_status: self.payment_status(),
        })
    }

    /// Move to `status`.
    ///
    /// Cancelled is terminal, and a paid invoice cannot be cancelled.
    pub fn change_status(&mut self, status: InvoiceStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_cancelled() && status != InvoiceStatus::Cancelled {
            return Err(DomainError::invariant(format!(
                "invoice {} is cancelled",
                self.number
            )));
        }
        if status == InvoiceStatus::Cancelled && !self.is_cancelled() {
            self.ensure_not_locked()?;
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl PricedDocument for Invoice {
    const KIND: DocumentKind = DocumentKind::Invoice;

    fn number(&self) -> &str {
        &self.number
    }

    fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    fn totals(&self) -> &Totals {
        &self.totals
    }
}

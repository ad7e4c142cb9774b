use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{CustomerId, DocumentId, DomainError, DomainResult, Entity, UserId};

use crate::document::{validate_number, validate_text, PricedDocument};
use crate::line::LineItem;
use crate::numbering::DocumentKind;
use crate::pricing::{compute_totals, Totals};

/// Quotation status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

/// Input for issuing a quotation.
///
/// `number` is optional; the service generates one when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationDraft {
    #[serde(default)]
    pub number: Option<String>,
    pub customer_id: CustomerId,
    pub lines: Vec<LineItem>,
    pub issue_date: NaiveDate,
    pub valid_until: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    pub created_by: UserId,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationChanges {
    pub number: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub lines: Option<Vec<LineItem>>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

/// A priced offer to a customer. Never moves stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    id: DocumentId,
    number: String,
    customer_id: CustomerId,
    lines: Vec<LineItem>,
    issue_date: NaiveDate,
    valid_until: NaiveDate,
    status: QuotationStatus,
    notes: Option<String>,
    terms: Option<String>,
    totals: Totals,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn ensure_validity_window(issue_date: NaiveDate, valid_until: NaiveDate) -> DomainResult<()> {
    if valid_until <= issue_date {
        return Err(DomainError::invalid(
            "valid until date must be after issue date",
        ));
    }
    Ok(())
}

impl Quotation {
    /// Build a draft quotation with totals derived from `draft.lines`.
    pub fn issue(
        id: DocumentId,
        number: String,
        draft: QuotationDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_validity_window(draft.issue_date, draft.valid_until)?;
        let totals = compute_totals(&draft.lines)?;

        Ok(Self {
            id,
            number: validate_number(number)?,
            customer_id: draft.customer_id,
            lines: draft.lines,
            issue_date: draft.issue_date,
            valid_until: draft.valid_until,
            status: QuotationStatus::Draft,
            notes: validate_text("notes", draft.notes)?,
            terms: validate_text("terms", draft.terms)?,
            totals,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn valid_until(&self) -> NaiveDate {
        self.valid_until
    }

    pub fn status(&self) -> QuotationStatus {
        self.status
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

    /// Past its validity window on `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }

    /// Rejected or expired quotations cannot become invoices.
    pub fn can_convert_to_invoice(&self) -> bool {
        !matches!(
            self.status,
            QuotationStatus::Rejected | QuotationStatus::Expired
        )
    }

    /// Apply a partial update. Nothing changes unless every field validates.
    pub fn apply_changes(
        &mut self,
        changes: QuotationChanges,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(number) = changes.number {
            next.number = validate_number(number)?;
        }
        if let Some(customer_id) = changes.customer_id {
            next.customer_id = customer_id;
        }
        if let Some(valid_until) = changes.valid_until {
            ensure_validity_window(next.issue_date, valid_until)?;
            next.valid_until = valid_until;
        }
        if changes.notes.is_some() {
            next.notes = validate_text("notes", changes.notes)?;
        }
        if changes.terms.is_some() {
            next.terms = validate_text("terms", changes.terms)?;
        }
        if let Some(lines) = changes.lines {
            next.totals = compute_totals(&lines)?;
            next.lines = lines;
        }

        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn change_status(&mut self, status: QuotationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

impl Entity for Quotation {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl PricedDocument for Quotation {
    const KIND: DocumentKind = DocumentKind::Quotation;

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

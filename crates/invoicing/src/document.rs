//! Behaviour shared by quotations and invoices.

use billbook_core::{CustomerId, DocumentId, DomainError, DomainResult, Entity};

use crate::line::LineItem;
use crate::numbering::DocumentKind;
use crate::pricing::Totals;

const MAX_TEXT_LEN: usize = 1000;

/// A numbered, priced document owning its line items.
///
/// Stores use this to enforce number uniqueness; services use it to reach
/// the lines a reservation is made for.
pub trait PricedDocument: Entity<Id = DocumentId> + Clone + Send + Sync + 'static {
    const KIND: DocumentKind;

    fn number(&self) -> &str;

    fn customer_id(&self) -> CustomerId;

    fn lines(&self) -> &[LineItem];

    fn totals(&self) -> &Totals;
}

/// Document numbers are free text once issued; only emptiness is rejected.
pub(crate) fn validate_number(number: String) -> DomainResult<String> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid("document number is required"));
    }
    Ok(trimmed.to_string())
}

/// Notes and terms: trimmed, empty becomes `None`, at most 1000 characters.
pub(crate) fn validate_text(field: &str, value: Option<String>) -> DomainResult<Option<String>> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if value
        .as_deref()
        .is_some_and(|v| v.chars().count() > MAX_TEXT_LEN)
    {
        return Err(DomainError::invalid(format!(
            "{field} cannot exceed 1000 characters"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_is_trimmed_and_required() {
        assert_eq!(validate_number("  INV-2026-0001 ".to_string()).unwrap(), "INV-2026-0001");
        assert!(validate_number("   ".to_string()).is_err());
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(validate_text("notes", Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            validate_text("notes", Some(" net 30 ".to_string())).unwrap(),
            Some("net 30".to_string())
        );
        assert!(validate_text("terms", Some("x".repeat(1001))).is_err());
    }
}

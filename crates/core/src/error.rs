//! Domain error model.

use thiserror::Error;

use crate::id::ItemId;
use crate::money::{Money, Quantity};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every kind is deterministic: the same input against the same stored state
/// yields the same error. Storage failures live in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (malformed line item, out of range percent, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The referenced customer is missing or has been deactivated.
    #[error("customer not found")]
    CustomerNotFound,

    /// A line references a catalog item that does not exist.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// A line references a catalog item that has been deactivated.
    #[error("item {0} is inactive")]
    ItemInactive(ItemId),

    /// Not enough stock to cover the requested quantity.
    #[error("insufficient stock for item: {item_name}. Available: {available}, Required: {required}")]
    InsufficientStock {
        item_id: ItemId,
        item_name: String,
        available: Quantity,
        required: Quantity,
    },

    /// A paid invoice cannot have its financial content changed.
    #[error("document locked: {0}")]
    DocumentLocked(String),

    /// The human-readable document number is already taken.
    #[error("document number already exists: {0}")]
    DuplicateNumber(String),

    /// A payment would push the amount paid above the invoice total.
    #[error("payment of {amount} exceeds balance due of {balance_due}")]
    PaymentExceedsTotal { amount: Money, balance_due: Money },

    /// A domain invariant was violated (illegal status transition, ...).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn locked(msg: impl Into<String>) -> Self {
        Self::DocumentLocked(msg.into())
    }
}

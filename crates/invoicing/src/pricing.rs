//! Pricing engine: derives document totals from line items.
//!
//! Pure and deterministic. Every amount is an exact `Decimal`, so running the
//! engine twice over the same lines yields identical `Totals`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Money};

use crate::line::LineItem;

/// Per-line amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakdown {
    pub line_subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub line_total: Money,
}

/// Document totals. Always derived from the lines, never taken from input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub total_discount: Money,
    pub total_tax: Money,
    pub total: Money,
    pub per_line: Vec<LineBreakdown>,
}

fn overflow() -> DomainError {
    DomainError::invalid("line amounts overflow")
}

fn price_line(line: &LineItem) -> DomainResult<LineBreakdown> {
    line.validate()?;

    let line_subtotal = line
        .quantity
        .value()
        .checked_mul(line.unit_price.value())
        .ok_or_else(overflow)?;
    let discount_amount = line.discount.of(line_subtotal).ok_or_else(overflow)?;
    let after_discount = line_subtotal - discount_amount;
    let tax_amount = line.tax_rate.of(after_discount).ok_or_else(overflow)?;
    let line_total = after_discount.checked_add(tax_amount).ok_or_else(overflow)?;

    Ok(LineBreakdown {
        line_subtotal: Money::new(line_subtotal),
        discount_amount: Money::new(discount_amount),
        tax_amount: Money::new(tax_amount),
        line_total: Money::new(line_total),
    })
}

fn accumulate(acc: Decimal, value: Money) -> DomainResult<Decimal> {
    acc.checked_add(value.value()).ok_or_else(overflow)
}

/// Compute subtotal, discount, tax and grand total for an ordered set of lines.
///
/// Aggregates are sums of the per-line components (not of `line_total`), and
/// `total = subtotal - total_discount + total_tax`.
///
/// Fails with `InvalidInput` on an empty slice, a non-positive quantity, a
/// negative unit price, or arithmetic overflow.
pub fn compute_totals(lines: &[LineItem]) -> DomainResult<Totals> {
    if lines.is_empty() {
        return Err(DomainError::invalid("at least one line item is required"));
    }

    let per_line = lines.iter().map(price_line).collect::<DomainResult<Vec<_>>>()?;

    let mut subtotal = Decimal::ZERO;
    let mut total_discount = Decimal::ZERO;
    let mut total_tax = Decimal::ZERO;
    for line in &per_line {
        subtotal = accumulate(subtotal, line.line_subtotal)?;
        total_discount = accumulate(total_discount, line.discount_amount)?;
        total_tax = accumulate(total_tax, line.tax_amount)?;
    }

    let total = (subtotal - total_discount)
        .checked_add(total_tax)
        .ok_or_else(overflow)?;

    Ok(Totals {
        subtotal: Money::new(subtotal),
        total_discount: Money::new(total_discount),
        total_tax: Money::new(total_tax),
        total: Money::new(total),
        per_line,
    })
}

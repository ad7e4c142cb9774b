use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, ItemId, Money, Percent, Quantity};

/// One priced entry of a quotation or invoice.
///
/// `item_id` is a non-owning reference to a catalog item; the line itself is
/// owned by exactly one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_id: ItemId,
    pub quantity: Quantity,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Percent,
    #[serde(default)]
    pub tax_rate: Percent,
}

impl LineItem {
    /// Validated constructor. Discount and tax rate default to 0.
    pub fn new(
        item_id: ItemId,
        quantity: Decimal,
        unit_price: Decimal,
        discount: Option<Decimal>,
        tax_rate: Option<Decimal>,
    ) -> DomainResult<Self> {
        let line = Self {
            item_id,
            quantity: Quantity::positive(quantity)?,
            unit_price: Money::non_negative(unit_price, "unit price")?,
            discount: discount.map(Percent::new).transpose()?.unwrap_or_default(),
            tax_rate: tax_rate.map(Percent::new).transpose()?.unwrap_or_default(),
        };
        Ok(line)
    }

    /// Check the bounds that the typed fields alone cannot enforce.
    ///
    /// Percentages are range-checked on construction; quantity and price are
    /// plain decimals and may arrive from deserialized input.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity.value() <= Decimal::ZERO {
            return Err(DomainError::invalid(format!(
                "quantity for item {} must be greater than 0",
                self.item_id
            )));
        }
        if self.unit_price.value() < Decimal::ZERO {
            return Err(DomainError::invalid(format!(
                "unit price for item {} cannot be negative",
                self.item_id
            )));
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, ItemId, Money, Percent, Quantity};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

/// Unit an item is sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemUnit {
    Piece,
    Kg,
    Lbs,
    Meter,
    Feet,
    Liter,
    Gallon,
    Hour,
    Day,
}

/// Descriptive and pricing fields of a catalog item.
///
/// Stock is deliberately absent: it only moves through reservations or
/// [`CatalogItem::correct_stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub category: String,
    pub unit: ItemUnit,
    pub min_stock_level: Decimal,
    pub tax_rate: Decimal,
}

/// Validated form of [`NewCatalogItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ItemDetails {
    name: String,
    description: Option<String>,
    sku: String,
    price: Money,
    cost: Money,
    category: String,
    unit: ItemUnit,
    min_stock_level: Quantity,
    tax_rate: Percent,
}

impl TryFrom<NewCatalogItem> for ItemDetails {
    type Error = DomainError;

    fn try_from(input: NewCatalogItem) -> Result<Self, Self::Error> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::invalid("item name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::invalid("item name cannot exceed 100 characters"));
        }

        let description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_deref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(DomainError::invalid(
                "description cannot exceed 500 characters",
            ));
        }

        let sku = normalize_sku(&input.sku);
        if sku.is_empty() {
            return Err(DomainError::invalid("SKU is required"));
        }

        let category = input.category.trim().to_string();
        if category.is_empty() {
            return Err(DomainError::invalid("category is required"));
        }

        let min_stock_level = Quantity::non_negative(input.min_stock_level)
            .map_err(|_| DomainError::invalid("minimum stock level cannot be negative"))?;

        Ok(Self {
            name,
            description,
            sku,
            price: Money::non_negative(input.price, "price")?,
            cost: Money::non_negative(input.cost, "cost")?,
            category,
            unit: input.unit,
            min_stock_level,
            tax_rate: Percent::new(input.tax_rate)?,
        })
    }
}

/// SKUs are compared trimmed and upper-cased.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

/// A sellable catalog item with its on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    id: ItemId,
    details: ItemDetails,
    stock_quantity: Quantity,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn register(
        id: ItemId,
        input: NewCatalogItem,
        opening_stock: Decimal,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            details: input.try_into()?,
            stock_quantity: Quantity::non_negative(opening_stock)?,
            is_active: true,
            created_at,
        })
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn description(&self) -> Option<&str> {
        self.details.description.as_deref()
    }

    pub fn sku(&self) -> &str {
        &self.details.sku
    }

    pub fn price(&self) -> Money {
        self.details.price
    }

    pub fn cost(&self) -> Money {
        self.details.cost
    }

    pub fn category(&self) -> &str {
        &self.details.category
    }

    pub fn unit(&self) -> ItemUnit {
        self.details.unit
    }

    pub fn tax_rate(&self) -> Percent {
        self.details.tax_rate
    }

    pub fn min_stock_level(&self) -> Quantity {
        self.details.min_stock_level
    }

    pub fn stock_quantity(&self) -> Quantity {
        self.stock_quantity
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stock at or below the configured minimum.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.details.min_stock_level
    }

    /// `(price - cost) / cost * 100`, rounded to 2 decimal places; 0 when cost is 0.
    pub fn profit_margin(&self) -> Decimal {
        let cost = self.details.cost.value();
        if cost.is_zero() {
            return Decimal::ZERO;
        }
        ((self.details.price.value() - cost) / cost * Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// Whether `quantity` could be taken from stock right now.
    pub fn can_reserve(&self, quantity: Quantity) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }

    /// Conditional decrement: take `quantity` only if that much is on hand.
    ///
    /// Stock is left untouched on failure.
    pub fn take_stock(&mut self, quantity: Quantity) -> DomainResult<()> {
        if self.stock_quantity < quantity {
            return Err(DomainError::InsufficientStock {
                item_id: self.id,
                item_name: self.details.name.clone(),
                available: self.stock_quantity,
                required: quantity,
            });
        }
        self.stock_quantity -= quantity;
        Ok(())
    }

    /// Put `quantity` back on hand (released reservation).
    pub fn return_stock(&mut self, quantity: Quantity) -> DomainResult<()> {
        self.stock_quantity = self
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invalid("stock quantity overflow"))?;
        Ok(())
    }

    /// Out-of-band stock correction (stock count, goods received).
    pub fn correct_stock(&mut self, new_quantity: Decimal) -> DomainResult<()> {
        self.ensure_active()?;
        self.stock_quantity = Quantity::non_negative(new_quantity)
            .map_err(|_| DomainError::invalid("stock quantity must be a non-negative number"))?;
        Ok(())
    }

    /// Replace the descriptive/pricing fields. Stock is unaffected.
    pub fn revise(&mut self, input: NewCatalogItem) -> DomainResult<()> {
        self.ensure_active()?;
        self.details = input.try_into()?;
        Ok(())
    }

    /// Soft delete: the item stays referenced by existing documents but can
    /// no longer be put on new lines.
    pub fn deactivate(&mut self) -> DomainResult<()> {
        self.ensure_active()?;
        self.is_active = false;
        Ok(())
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::ItemNotFound(self.id));
        }
        Ok(())
    }
}

impl Entity for CatalogItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> NewCatalogItem {
        NewCatalogItem {
            name: "Steel bolt M8".to_string(),
            description: Some("Zinc plated".to_string()),
            sku: " bolt-m8 ".to_string(),
            price: dec!(1.50),
            cost: dec!(1.00),
            category: "Hardware".to_string(),
            unit: ItemUnit::Piece,
            min_stock_level: dec!(10),
            tax_rate: dec!(5),
        }
    }

    fn item(stock: Decimal) -> CatalogItem {
        CatalogItem::register(ItemId::new(), input(), stock, Utc::now()).unwrap()
    }

    #[test]
    fn register_normalizes_sku() {
        assert_eq!(item(dec!(0)).sku(), "BOLT-M8");
    }

    #[test]
    fn register_rejects_negative_price_and_stock() {
        let mut bad = input();
        bad.price = dec!(-1);
        assert!(CatalogItem::register(ItemId::new(), bad, dec!(0), Utc::now()).is_err());
        assert!(CatalogItem::register(ItemId::new(), input(), dec!(-1), Utc::now()).is_err());
    }

    #[test]
    fn register_rejects_out_of_range_tax_rate() {
        let mut bad = input();
        bad.tax_rate = dec!(101);
        assert!(CatalogItem::register(ItemId::new(), bad, dec!(0), Utc::now()).is_err());
    }

    #[test]
    fn take_stock_is_conditional() {
        let mut it = item(dec!(10));
        it.take_stock(Quantity::new(dec!(6))).unwrap();
        assert_eq!(it.stock_quantity(), Quantity::new(dec!(4)));

        let err = it.take_stock(Quantity::new(dec!(6))).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                available,
                required,
                ..
            } => {
                assert_eq!(available, Quantity::new(dec!(4)));
                assert_eq!(required, Quantity::new(dec!(6)));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(it.stock_quantity(), Quantity::new(dec!(4)));
    }

    #[test]
    fn return_stock_adds_back() {
        let mut it = item(dec!(2));
        it.return_stock(Quantity::new(dec!(3))).unwrap();
        assert_eq!(it.stock_quantity(), Quantity::new(dec!(5)));
    }

    #[test]
    fn return_stock_overflow_is_rejected() {
        let mut it = item(Decimal::MAX);
        assert!(matches!(
            it.return_stock(Quantity::new(dec!(1))),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(it.stock_quantity(), Quantity::new(Decimal::MAX));
    }

    #[test]
    fn low_stock_at_or_below_minimum() {
        assert!(item(dec!(10)).is_low_stock());
        assert!(!item(dec!(11)).is_low_stock());
    }

    #[test]
    fn profit_margin_is_derived() {
        assert_eq!(item(dec!(0)).profit_margin(), dec!(50.00));

        let mut free = input();
        free.cost = dec!(0);
        let it = CatalogItem::register(ItemId::new(), free, dec!(0), Utc::now()).unwrap();
        assert_eq!(it.profit_margin(), Decimal::ZERO);
    }

    #[test]
    fn correct_stock_rejects_negative_and_inactive() {
        let mut it = item(dec!(5));
        assert!(it.correct_stock(dec!(-1)).is_err());
        it.correct_stock(dec!(42)).unwrap();
        assert_eq!(it.stock_quantity(), Quantity::new(dec!(42)));

        it.deactivate().unwrap();
        assert_eq!(
            it.correct_stock(dec!(1)),
            Err(DomainError::ItemNotFound(it.id_typed()))
        );
    }

    #[test]
    fn inactive_items_cannot_be_reserved() {
        let mut it = item(dec!(5));
        assert!(it.can_reserve(Quantity::new(dec!(5))));
        it.deactivate().unwrap();
        assert!(!it.can_reserve(Quantity::new(dec!(1))));
    }

    #[test]
    fn revise_keeps_stock() {
        let mut it = item(dec!(7));
        let mut changed = input();
        changed.price = dec!(2.25);
        it.revise(changed).unwrap();
        assert_eq!(it.price(), Money::new(dec!(2.25)));
        assert_eq!(it.stock_quantity(), Quantity::new(dec!(7)));
    }

    #[test]
    fn unit_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ItemUnit::Gallon).unwrap(), "\"gallon\"");
    }
}

//! Decimal value objects: money, quantities and percentages.
//!
//! All three wrap `rust_decimal::Decimal` so repeated arithmetic stays exact
//! (base-10, no binary floating point drift).

use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub, SubAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Money entering the domain from the outside (prices, costs, payments).
    pub fn non_negative(value: Decimal, field: &str) -> DomainResult<Self> {
        if value < Decimal::ZERO {
            return Err(DomainError::invalid(format!("{field} cannot be negative")));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A stock or line quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Quantity demanded by a line item: strictly positive.
    pub fn positive(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::invalid("quantity must be greater than 0"));
        }
        Ok(Self(value))
    }

    /// Quantity held in stock: zero or more.
    pub fn non_negative(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO {
            return Err(DomainError::invalid("stock quantity cannot be negative"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A percentage in `[0, 100]` (discounts, tax rates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(DomainError::invalid(format!(
                "percentage must be between 0 and 100 (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `amount × self / 100`, or `None` on overflow.
    pub fn of(&self, amount: Decimal) -> Option<Decimal> {
        amount.checked_mul(self.0)?.checked_div(Decimal::ONE_HUNDRED)
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for Decimal {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl core::fmt::Display for Percent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

macro_rules! impl_decimal_arithmetic {
    ($t:ty) => {
        impl Add for $t {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $t {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl AddAssign for $t {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $t {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Sum for $t {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, |acc, x| acc + x)
            }
        }
    };
}

impl_decimal_arithmetic!(Money);
impl_decimal_arithmetic!(Quantity);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_arithmetic() {
        let a = Money::new(dec!(10.50));
        let b = Money::new(dec!(0.25));
        assert_eq!(a + b, Money::new(dec!(10.75)));
        assert_eq!(a - b, Money::new(dec!(10.25)));
        assert_eq!([a, b].into_iter().sum::<Money>(), Money::new(dec!(10.75)));
    }

    #[test]
    fn money_rejects_negative_input() {
        assert!(Money::non_negative(dec!(0), "price").is_ok());
        assert_eq!(
            Money::non_negative(dec!(-0.01), "price"),
            Err(DomainError::invalid("price cannot be negative"))
        );
    }

    #[test]
    fn quantity_validation() {
        assert!(Quantity::positive(dec!(0.01)).is_ok());
        assert!(Quantity::positive(dec!(0)).is_err());
        assert!(Quantity::non_negative(dec!(0)).is_ok());
        assert!(Quantity::non_negative(dec!(-1)).is_err());
    }

    #[test]
    fn percent_bounds() {
        assert!(Percent::new(dec!(0)).is_ok());
        assert!(Percent::new(dec!(100)).is_ok());
        assert!(Percent::new(dec!(100.01)).is_err());
        assert!(Percent::new(dec!(-1)).is_err());
    }

    #[test]
    fn percent_of_amount() {
        let pct = Percent::new(dec!(12.5)).unwrap();
        assert_eq!(pct.of(dec!(80)), Some(dec!(10)));
    }

    #[test]
    fn percent_deserialization_is_validated() {
        let ok: Percent = serde_json::from_str("\"7.5\"").unwrap();
        assert_eq!(ok.value(), dec!(7.5));
        assert!(serde_json::from_str::<Percent>("\"150\"").is_err());
    }
}

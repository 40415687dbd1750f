//! Unit price calculation.
//!
//! A product carries a base `price` and an optional `discount_price`; a
//! variant may add an `additional_price` on top. The price a customer pays
//! for one unit is the discounted price when one exists, otherwise the base
//! price, plus the variant surcharge.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Price inputs for one unit of a product, optionally in a specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub additional_price: Option<Decimal>,
}

impl Pricing {
    /// Pricing for a product without a variant.
    #[must_use]
    pub const fn new(price: Decimal, discount_price: Option<Decimal>) -> Self {
        Self {
            price,
            discount_price,
            additional_price: None,
        }
    }

    /// Add a variant surcharge.
    #[must_use]
    pub const fn with_variant(mut self, additional_price: Option<Decimal>) -> Self {
        self.additional_price = additional_price;
        self
    }

    fn surcharge(&self) -> Decimal {
        self.additional_price.unwrap_or(Decimal::ZERO)
    }

    /// Price charged per unit: discounted base (if any) plus surcharge.
    #[must_use]
    pub fn effective_unit_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price) + self.surcharge()
    }

    /// Undiscounted price per unit: base plus surcharge.
    #[must_use]
    pub fn original_unit_price(&self) -> Decimal {
        self.price + self.surcharge()
    }

    /// Effective unit price times `quantity`.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Decimal {
        self.effective_unit_price() * Decimal::from(quantity)
    }

    /// Whole-number discount percentage of the base price, truncated.
    ///
    /// Zero when there is no discount or the base price is not positive.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        let Some(discount) = self.discount_price else {
            return 0;
        };
        if self.price <= Decimal::ZERO || discount >= self.price {
            return 0;
        }
        let pct = (self.price - discount) / self.price * Decimal::ONE_HUNDRED;
        pct.trunc().to_u32().unwrap_or(0)
    }

    /// Whether a discount is in effect.
    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.discount_price.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    #[test]
    fn test_base_price_only() {
        let p = Pricing::new(d(100, 0), None);
        assert_eq!(p.effective_unit_price(), d(100, 0));
        assert_eq!(p.original_unit_price(), d(100, 0));
        assert_eq!(p.discount_percentage(), 0);
        assert!(!p.is_discounted());
    }

    #[test]
    fn test_discount_with_variant_surcharge() {
        let p = Pricing::new(d(10000, 2), Some(d(8000, 2))).with_variant(Some(d(1500, 2)));
        assert_eq!(p.effective_unit_price(), d(9500, 2));
        assert_eq!(p.original_unit_price(), d(11500, 2));
        assert_eq!(p.line_total(2), d(19000, 2));
    }

    #[test]
    fn test_discount_percentage_truncates() {
        assert_eq!(Pricing::new(d(100, 0), Some(d(80, 0))).discount_percentage(), 20);
        assert_eq!(Pricing::new(d(30, 0), Some(d(20, 0))).discount_percentage(), 33);
        assert_eq!(
            Pricing::new(d(1999, 2), Some(d(1499, 2))).discount_percentage(),
            25
        );
        assert_eq!(Pricing::new(d(0, 0), Some(d(0, 0))).discount_percentage(), 0);
    }

    #[test]
    fn test_zero_quantity_line_total() {
        let p = Pricing::new(d(5, 0), None);
        assert_eq!(p.line_total(0), Decimal::ZERO);
    }
}

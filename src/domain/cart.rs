//! Cart arithmetic.
//!
//! Carts are pre-purchase state: totals are always evaluated live against the
//! current catalog prices, never snapshotted.

use crate::domain::value_objects::{Money, Quantity};

/// One (variant, quantity) pairing as read from the caller's cart.
#[derive(Clone, Debug)]
pub struct CartLine {
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct CartTotals {
    pub total_items: u32,
    pub total_price: Money,
}

/// Live totals over the cart lines. Lines priced in a different currency than
/// the running total are skipped rather than summed.
pub fn totals(currency: &str, lines: &[CartLine]) -> CartTotals {
    let total_items = lines.iter().fold(0u32, |acc, l| acc.saturating_add(l.quantity));
    let total_price = lines
        .iter()
        .fold(Money::zero(currency), |acc, l| acc.add(&l.subtotal()).unwrap_or(acc));
    CartTotals { total_items, total_price }
}

/// Outcome of an update-quantity request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityChange {
    Set(Quantity),
    Remove,
}

/// A requested quantity of zero or less removes the line.
pub fn classify_quantity(requested: i64) -> QuantityChange {
    if requested <= 0 {
        QuantityChange::Remove
    } else {
        QuantityChange::Set(Quantity::new(requested.min(i64::from(u32::MAX)) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::DEFAULT_CURRENCY;
    use rust_decimal::Decimal;

    fn line(quantity: u32, price: Decimal) -> CartLine {
        CartLine { quantity, unit_price: Money::pen(price) }
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        let t = totals(DEFAULT_CURRENCY, &[]);
        assert_eq!(t.total_items, 0);
        assert_eq!(t.total_price.amount(), Decimal::ZERO);
    }

    #[test]
    fn totals_sum_quantities_and_live_prices() {
        let lines = vec![line(2, Decimal::new(10000, 2)), line(3, Decimal::new(500, 2))];
        let t = totals(DEFAULT_CURRENCY, &lines);
        assert_eq!(t.total_items, 5);
        assert_eq!(t.total_price.amount(), Decimal::new(21500, 2));
    }

    #[test]
    fn mismatched_currency_lines_are_skipped() {
        let lines = vec![
            line(1, Decimal::new(100, 0)),
            CartLine { quantity: 1, unit_price: Money::new(Decimal::new(999, 0), "USD") },
        ];
        let t = totals(DEFAULT_CURRENCY, &lines);
        assert_eq!(t.total_price.amount(), Decimal::new(100, 0));
    }

    #[test]
    fn zero_or_negative_quantity_removes() {
        assert_eq!(classify_quantity(0), QuantityChange::Remove);
        assert_eq!(classify_quantity(-3), QuantityChange::Remove);
        assert_eq!(classify_quantity(5), QuantityChange::Set(Quantity::new(5)));
    }
}

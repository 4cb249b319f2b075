//! Checkout settlement.
//!
//! The pure half of order placement: given the cart lines and the catalog
//! state observed inside the checkout transaction, either reject the checkout
//! or produce the exact order that must be committed. Prices are captured here,
//! once, and the resulting `price_at_purchase` values are owned by the
//! settlement; later catalog changes cannot reach them.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{Money, Quantity};

/// One cart line joined with the variant it references, as read at the start
/// of the checkout transaction.
#[derive(Clone, Debug)]
pub struct CheckoutLine {
    pub variant_id: Uuid,
    pub product_name: String,
    pub unit_price: Money,
    pub stock: Quantity,
    pub quantity: u32,
}

/// An order line ready to persist. `price_at_purchase` is fixed forever.
#[derive(Clone, Debug)]
pub struct SettledLine {
    pub variant_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_purchase: Money,
}

#[derive(Clone, Debug)]
pub struct Settlement {
    pub total: Money,
    pub lines: Vec<SettledLine>,
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("insufficient stock for {product}")]
    InsufficientStock { product: String },
    #[error("cart lines are priced in more than one currency")]
    CurrencyMismatch,
}

/// Validates every line against current stock and computes the order total
/// from prices observed at this instant. No line is settled unless all lines
/// settle.
pub fn settle(lines: &[CheckoutLine]) -> Result<Settlement, CheckoutError> {
    let first = lines.first().ok_or(CheckoutError::EmptyCart)?;
    let mut total = Money::zero(first.unit_price.currency());
    let mut settled = Vec::with_capacity(lines.len());

    for line in lines {
        if line.stock.value() < line.quantity {
            return Err(CheckoutError::InsufficientStock { product: line.product_name.clone() });
        }
        total = total
            .add(&line.unit_price.multiply(line.quantity))
            .map_err(|_| CheckoutError::CurrencyMismatch)?;
        settled.push(SettledLine {
            variant_id: line.variant_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            price_at_purchase: line.unit_price.clone(),
        });
    }

    Ok(Settlement { total, lines: settled })
}

/// A blank or absent billing address falls back to the shipping address.
pub fn resolve_billing(shipping: &str, billing: Option<&str>) -> String {
    match billing {
        Some(b) if !b.trim().is_empty() => b.to_string(),
        _ => shipping.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(stock: u32, price: Decimal, quantity: u32) -> CheckoutLine {
        CheckoutLine {
            variant_id: Uuid::new_v4(),
            product_name: "Alfajor".to_string(),
            unit_price: Money::pen(price),
            stock: Quantity::new(stock),
            quantity,
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = settle(&[]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn two_units_at_one_hundred_settle_at_two_hundred() {
        let lines = vec![line(10, Decimal::new(10000, 2), 2)];
        let settlement = settle(&lines).unwrap();
        assert_eq!(settlement.total.amount(), Decimal::new(20000, 2));
        assert_eq!(settlement.lines.len(), 1);
        assert_eq!(settlement.lines[0].quantity, 2);
        assert_eq!(settlement.lines[0].price_at_purchase.amount(), Decimal::new(10000, 2));
    }

    #[test]
    fn quantity_above_stock_rejects_and_names_the_product() {
        let lines = vec![line(10, Decimal::new(10000, 2), 15)];
        let err = settle(&lines).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("insufficient"));
        assert!(message.contains("Alfajor"));
    }

    #[test]
    fn one_bad_line_settles_nothing() {
        let lines = vec![line(10, Decimal::new(1000, 2), 2), line(1, Decimal::new(500, 2), 3)];
        assert!(settle(&lines).is_err());
    }

    #[test]
    fn total_spans_all_lines() {
        let lines = vec![line(10, Decimal::new(10000, 2), 2), line(5, Decimal::new(2550, 2), 1)];
        let settlement = settle(&lines).unwrap();
        assert_eq!(settlement.total.amount(), Decimal::new(22550, 2));
    }

    #[test]
    fn settled_price_survives_later_catalog_change() {
        let mut catalog_line = line(10, Decimal::new(10000, 2), 1);
        let settlement = settle(std::slice::from_ref(&catalog_line)).unwrap();

        catalog_line.unit_price = Money::pen(Decimal::new(15000, 2));

        assert_eq!(settlement.lines[0].price_at_purchase.amount(), Decimal::new(10000, 2));
    }

    #[test]
    fn stock_decreases_by_exactly_the_purchased_quantity() {
        let catalog_line = line(10, Decimal::new(10000, 2), 2);
        let settlement = settle(std::slice::from_ref(&catalog_line)).unwrap();
        let remaining = catalog_line.stock.subtract(settlement.lines[0].quantity).unwrap();
        assert_eq!(remaining.value(), 8);
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let mut other = line(10, Decimal::new(100, 0), 1);
        other.unit_price = Money::new(Decimal::new(100, 0), "USD");
        let lines = vec![line(10, Decimal::new(100, 0), 1), other];
        assert!(matches!(settle(&lines), Err(CheckoutError::CurrencyMismatch)));
    }

    #[test]
    fn billing_falls_back_to_shipping() {
        assert_eq!(resolve_billing("Calle Falsa 123", None), "Calle Falsa 123");
        assert_eq!(resolve_billing("Calle Falsa 123", Some("   ")), "Calle Falsa 123");
        assert_eq!(resolve_billing("Calle Falsa 123", Some("Av. Sol 45")), "Av. Sol 45");
    }
}

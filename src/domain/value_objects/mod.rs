//! Value objects shared across the catalog, cart and checkout paths.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currency assumed when a cart has no lines to take one from.
pub const DEFAULT_CURRENCY: &str = "PEN";

/// Stock keeping unit. Normalized on construction: trimmed and uppercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() {
            return Err(SkuError::Empty);
        }
        if value.len() > 50 {
            return Err(SkuError::TooLong);
        }
        Ok(Self(value))
    }

    /// SKU of the default variant created alongside a new product.
    pub fn for_default(base_sku: &str) -> Result<Self, SkuError> {
        Self::new(format!("{}-DEF", base_sku.trim()))
    }

    /// Composes a variant SKU from the product's base SKU and the codes of its
    /// attribute values, ordered by attribute name.
    pub fn compose(base_sku: &str, attribute_codes: &[(String, String)]) -> Result<Self, SkuError> {
        let mut codes = attribute_codes.to_vec();
        codes.sort_by(|a, b| a.0.cmp(&b.0));
        let mut parts = vec![base_sku.trim().to_string()];
        parts.extend(codes.into_iter().map(|(_, code)| code.trim().to_string()));
        Self::new(parts.join("-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SkuError {
    #[error("sku must not be blank")]
    Empty,
    #[error("sku must be at most 50 characters")]
    TooLong,
}

/// An amount in a concrete currency. Amounts in different currencies never mix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }

    pub fn pen(amount: Decimal) -> Self {
        Self::new(amount, DEFAULT_CURRENCY)
    }

    pub fn zero(currency: &str) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero(DEFAULT_CURRENCY)
    }
}

#[derive(Debug, Clone, Error)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
}

/// A non-negative count of units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn add(&self, other: u32) -> Self {
        Self(self.0.saturating_add(other))
    }

    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 {
            None
        } else {
            Some(Self(self.0 - other))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_is_normalized() {
        let sku = Sku::new("  prod-001 ").unwrap();
        assert_eq!(sku.as_str(), "PROD-001");
    }

    #[test]
    fn sku_rejects_blank() {
        assert!(Sku::new("   ").is_err());
    }

    #[test]
    fn default_variant_sku_appends_def() {
        assert_eq!(Sku::for_default("shirt").unwrap().as_str(), "SHIRT-DEF");
    }

    #[test]
    fn composed_sku_orders_codes_by_attribute_name() {
        let codes = vec![
            ("Size".to_string(), "m".to_string()),
            ("Color".to_string(), "rd".to_string()),
        ];
        let sku = Sku::compose("tee", &codes).unwrap();
        assert_eq!(sku.as_str(), "TEE-RD-M");
    }

    #[test]
    fn money_add_same_currency() {
        let a = Money::pen(Decimal::new(100, 0));
        let b = Money::pen(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
    }

    #[test]
    fn money_add_rejects_mismatched_currency() {
        let a = Money::pen(Decimal::ONE);
        let b = Money::new(Decimal::ONE, "USD");
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn money_multiply() {
        let unit = Money::pen(Decimal::new(1050, 2));
        assert_eq!(unit.multiply(3).amount(), Decimal::new(3150, 2));
    }

    #[test]
    fn quantity_subtract_within_bounds() {
        let q = Quantity::new(10);
        assert_eq!(q.subtract(4).unwrap().value(), 6);
        assert!(q.subtract(11).is_none());
    }
}

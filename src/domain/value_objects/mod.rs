//! Value Objects for the print shop

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn sgd(amount: Decimal) -> Self { Self::new(amount, "SGD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
    /// Rounded to whole cents.
    pub fn rounded(&self) -> Money { Money::new(self.amount.round_dp(2), &self.currency) }
    /// Amount in minor units, as payment processors expect it.
    pub fn minor_units(&self) -> i64 {
        (self.amount * Decimal::ONE_HUNDRED).round().try_into().unwrap_or(i64::MAX)
    }
}

impl Default for Money { fn default() -> Self { Self::zero("SGD") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {:.2}", self.currency, self.amount) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

/// Package dimensions. The unit is decided by the owner: products are
/// catalogued in centimetres, the rate engine works in millimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions { pub length: f64, pub width: f64, pub height: f64 }

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Self { Self { length, width, height } }
    pub fn as_array(&self) -> [f64; 3] { [self.length, self.width, self.height] }
    pub fn scaled(&self, factor: f64) -> Self { Self::new(self.length * factor, self.width * factor, self.height * factor) }
    /// Centimetres to millimetres.
    pub fn cm_to_mm(&self) -> Self { self.scaled(10.0) }
}

/// Denormalised customer identity captured when a print request is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity { pub email: String, pub display_name: String }

impl Identity {
    pub const UNKNOWN_EMAIL: &'static str = "unknown";
    pub const UNKNOWN_NAME: &'static str = "Customer";

    pub fn placeholder() -> Self {
        Self { email: Self::UNKNOWN_EMAIL.to_string(), display_name: Self::UNKNOWN_NAME.to_string() }
    }
}

/// Shipping address; only the country drives pricing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)] pub name: String,
    #[serde(default)] pub street1: String,
    #[serde(default)] pub street2: Option<String>,
    #[serde(default)] pub city: String,
    #[serde(default)] pub zip: String,
    #[serde(default)] pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_add() {
        let a = Money::sgd(Decimal::new(100, 0));
        let b = Money::sgd(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert_eq!(a.add(&Money::new(Decimal::ONE, "USD")), Err(MoneyError::CurrencyMismatch));
    }
    #[test]
    fn test_rounded_to_cents() {
        assert_eq!(Money::sgd(Decimal::new(335, 3)).rounded().amount(), Decimal::new(34, 2));
        assert_eq!(Money::sgd(Decimal::new(1001, 3)).rounded().amount(), Decimal::new(100, 2));
    }

    #[test]
    fn test_minor_units() { assert_eq!(Money::sgd(Decimal::new(1234, 2)).minor_units(), 1234); }
    #[test]
    fn test_cm_to_mm() {
        let d = Dimensions::new(32.4, 22.9, 6.5).cm_to_mm();
        assert!((d.length - 324.0).abs() < 1e-9 && (d.height - 65.0).abs() < 1e-9);
    }
}

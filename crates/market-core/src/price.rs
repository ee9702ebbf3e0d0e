//! # Price Types
//!
//! Amounts are stored in the smallest currency unit (cents for USD).

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
        }
    }

    /// Parse a lowercase or uppercase ISO code
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            "gbp" => Some(Currency::GBP),
            "jpy" => Some(Currency::JPY),
            _ => None,
        }
    }

    /// Number of decimal places (JPY has 0, the rest have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    #[serde(default)]
    pub currency: Currency,
}

impl Price {
    /// Create a price from smallest unit (cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// A zero USD price (free plugin)
    pub fn free() -> Self {
        Self::from_cents(0, Currency::USD)
    }

    pub fn is_free(&self) -> bool {
        self.amount == 0
    }

    /// Amount in major units (dollars for USD, yen for JPY)
    pub fn as_decimal(&self) -> f64 {
        self.amount as f64 / 10_f64.powi(self.currency.decimal_places() as i32)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_decimal_respects_minor_units() {
        assert_eq!(Price::from_cents(1099, Currency::USD).as_decimal(), 10.99);
        assert_eq!(Price::from_cents(500, Currency::JPY).as_decimal(), 500.0);
        assert!(Price::free().is_free());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("USD"), Some(Currency::USD));
        assert_eq!(Currency::parse("gbp"), Some(Currency::GBP));
        assert_eq!(Currency::parse("xyz"), None);
    }
}

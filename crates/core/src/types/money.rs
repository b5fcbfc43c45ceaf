//! Type-safe money representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount with currency information.
///
/// Amounts are decimal to preserve precision; commerce APIs return them as
/// decimal strings ("24.00"), parsed at the conversion boundary. The core
/// never computes prices - subtotals and totals are denormalized data owned
/// by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "USD").
    pub currency_code: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency_code: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display (e.g., "$19.99"). Currencies without a known
    /// symbol fall back to the ISO code prefix ("SEK 19.99").
    #[must_use]
    pub fn display(&self) -> String {
        match symbol_for(&self.currency_code) {
            Some(symbol) => format!("{symbol}{:.2}", self.amount),
            None => format!("{} {:.2}", self.currency_code, self.amount),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("USD")
    }
}

fn symbol_for(code: &str) -> Option<&'static str> {
    match code {
        "USD" | "CAD" | "AUD" | "NZD" => Some("$"),
        "EUR" => Some("\u{20ac}"),
        "GBP" => Some("\u{a3}"),
        "JPY" => Some("\u{a5}"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_display_known_symbol() {
        let price = Money::new(Decimal::new(1999, 2), "USD");
        assert_eq!(price.display(), "$19.99");
    }

    #[test]
    fn test_display_unknown_currency() {
        let price = Money::new(Decimal::new(500, 0), "SEK");
        assert_eq!(price.display(), "SEK 500.00");
    }

    #[test]
    fn test_zero() {
        let zero = Money::zero("USD");
        assert_eq!(zero.amount, Decimal::ZERO);
        assert_eq!(zero.display(), "$0.00");
    }

    #[test]
    fn test_serde_string_amounts() {
        // serde-with-str keeps decimal precision over the wire
        let price = Money::new(Decimal::new(2450, 2), "EUR");
        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["amount"], "24.50");
        let back: Money = serde_json::from_value(json).unwrap();
        assert_eq!(back, price);
    }
}

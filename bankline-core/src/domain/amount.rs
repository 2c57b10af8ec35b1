//! Monetary amount accepted at the ledger boundary

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Largest number of decimal places an amount may carry (cents)
pub const MAX_SCALE: u32 = 2;

/// Largest magnitude a money column holds (`DECIMAL(18,2)`)
pub fn max_value() -> Decimal {
    Decimal::new(999_999_999_999_999_999, MAX_SCALE)
}

/// A strictly positive amount with at most cent precision.
///
/// Constructing one is the only validation the ledger relies on: any value of
/// this type can be debited or credited without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(Error::invalid_input("amount must be greater than zero"));
        }
        if value > max_value() {
            return Err(Error::invalid_input(format!(
                "amount cannot exceed {}",
                max_value()
            )));
        }
        let normalized = value.normalize();
        if normalized.scale() > MAX_SCALE {
            return Err(Error::invalid_input(
                "amount cannot have more than two decimal places",
            ));
        }
        let mut value = normalized;
        value.rescale(MAX_SCALE);
        Ok(Self(value))
    }

    /// Amount from a whole number of cents
    pub fn from_cents(cents: i64) -> Result<Self> {
        Self::new(Decimal::new(cents, MAX_SCALE))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('$').replace(',', "");
        let value = Decimal::from_str(&trimmed)
            .map_err(|_| Error::invalid_input(format!("invalid amount: {}", s.trim())))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive() {
        assert!(Amount::new(Decimal::ZERO).is_err());
        assert!(Amount::new(Decimal::new(-100, 2)).is_err());
    }

    #[test]
    fn test_rejects_sub_cent_precision() {
        assert!(Amount::new(Decimal::new(1001, 3)).is_err());
        // Trailing zeros are not extra precision
        assert!(Amount::new(Decimal::new(10500, 4)).is_ok());
    }

    #[test]
    fn test_parse_and_display() {
        let amount: Amount = "$1,250.5".parse().unwrap();
        assert_eq!(amount.value(), Decimal::new(125050, 2));
        assert_eq!(amount.to_string(), "1250.50");
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Amount = serde_json::from_str("40").unwrap();
        let from_string: Amount = serde_json::from_str("\"40.00\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<Amount>("-5").is_err());
    }

    #[test]
    fn test_rejects_values_beyond_column_range() {
        assert!(Amount::new(max_value()).is_ok());
        assert!("100000000000000000".parse::<Amount>().is_err());
        assert!("79228162514264337593543950335".parse::<Amount>().is_err());
        assert!(serde_json::from_str::<Amount>("\"79228162514264337593543950335\"").is_err());
        assert!(serde_json::from_str::<Amount>("1e17").is_err());
    }
}

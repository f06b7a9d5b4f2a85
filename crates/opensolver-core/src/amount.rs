use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A non-negative, finite quantity: capacities, profits and consumption rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "f64", into = "f64")
)]
pub struct Amount(f64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
    #[error("Value is empty")]
    Empty,
    #[error("Not a number: {0:?}")]
    NotANumber(String),
    #[error("Value must not be negative: {0}")]
    Negative(f64),
    #[error("Value must be finite")]
    NotFinite,
}

impl Amount {
    pub const ZERO: Amount = Amount(0.0);

    pub fn new(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        if value < 0.0 {
            return Err(AmountError::Negative(value));
        }
        // Normalise -0.0 so it prints as 0
        Ok(Amount(value + 0.0))
    }

    /// Parse user-entered text. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, AmountError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AmountError::Empty);
        }
        let value: f64 = text
            .parse()
            .map_err(|_| AmountError::NotANumber(text.to_string()))?;
        Self::new(value)
    }

    /// Parse, falling back to zero on any error.
    pub fn parse_or_zero(text: &str) -> Self {
        Self::parse(text).unwrap_or(Self::ZERO)
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> f64 {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

//! # Monetary Amounts
//!
//! Freight values are Brazilian reais held as integer centavos. Decimal
//! strings are parsed exactly; there is no float path into an [`Amount`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A non-negative amount of money in centavos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Construct from a centavo count.
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Construct from whole reais. Returns `None` on overflow.
    pub fn from_reais(reais: u64) -> Option<Self> {
        reais.checked_mul(100).map(Self)
    }

    /// The centavo count.
    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Require a strictly positive amount for the named field.
    pub fn require_positive(self, field: &'static str) -> Result<Self, ValidationError> {
        if self.is_zero() {
            Err(ValidationError::NonPositiveAmount { field })
        } else {
            Ok(self)
        }
    }

    /// Parse a decimal string such as `"2300"`, `"2300.5"` or `"2300.50"`.
    ///
    /// At most two fractional digits are accepted. Signs, exponents and
    /// thousands separators are rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if trimmed.ends_with('.') {
            return Err(invalid());
        }

        let reais: u64 = whole.parse().map_err(|_| invalid())?;
        let centavos: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        reais
            .checked_mul(100)
            .and_then(|c| c.checked_add(centavos))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

//! Order line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input is not a whole number.
    #[error("quantity must be a whole number, got {0:?}")]
    NotANumber(String),
}

/// A positive item quantity.
///
/// The minimum is 1; smaller values are clamped up rather than rejected.
/// No upper bound is enforced beyond the range of `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// The smallest allowed quantity.
    pub const MIN: Self = Self(1);

    /// Create a quantity, clamping to the minimum of 1.
    #[must_use]
    pub const fn new(n: u32) -> Self {
        if n < 1 { Self::MIN } else { Self(n) }
    }

    /// Parse user input into a quantity.
    ///
    /// Numeric input (including zero or negative values) is clamped to the
    /// valid range.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotANumber`] if the trimmed input is not an
    /// integer.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| QuantityError::NotANumber(s.to_owned()))?;
        let clamped = u32::try_from(n.max(1)).unwrap_or(u32::MAX);
        Ok(Self(clamped))
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<u32> for Quantity {
    fn from(n: u32) -> Self {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

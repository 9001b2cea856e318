//! Recipient tax ID (CPF) type.
//!
//! Carriers refuse to create a shipment without the recipient's CPF, so
//! checkout validates it up front instead of discovering the rejection at
//! provisioning time.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a CPF.
const CPF_DIGITS: usize = 11;

/// Errors that can occur when parsing a [`TaxId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxIdError {
    /// The input contains no digits.
    #[error("tax ID cannot be empty")]
    Empty,
    /// Wrong number of digits.
    #[error("tax ID must have exactly {expected} digits, got {got}")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digits found in the input.
        got: usize,
    },
    /// All digits identical (e.g. "00000000000") - a known-invalid pattern.
    #[error("tax ID cannot be a single repeated digit")]
    RepeatedDigit,
}

/// An 11-digit Brazilian CPF, stored as its digit string.
///
/// Accepts formatted input ("123.456.789-09") and keeps only the digits.
/// Sequences of a single repeated digit are rejected; the full checksum is
/// left to the carrier, which validates it anyway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TaxId(String);

impl TaxId {
    /// Parse a `TaxId` from free-form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not contain exactly 11 digits,
    /// or if all 11 digits are identical.
    pub fn parse(s: &str) -> Result<Self, TaxIdError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(TaxIdError::Empty);
        }
        if digits.len() != CPF_DIGITS {
            return Err(TaxIdError::WrongLength {
                expected: CPF_DIGITS,
                got: digits.len(),
            });
        }

        let mut chars = digits.chars();
        if let Some(first) = chars.next()
            && chars.all(|c| c == first)
        {
            return Err(TaxIdError::RepeatedDigit);
        }

        Ok(Self(digits))
    }

    /// Returns the bare 11-digit string.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaxId {
    type Err = TaxIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_formatting() {
        let cpf = TaxId::parse("123.456.789-09").unwrap();
        assert_eq!(cpf.digits(), "12345678909");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(
            TaxId::parse("1234567890"),
            Err(TaxIdError::WrongLength { got: 10, .. })
        ));
        assert_eq!(TaxId::parse("---"), Err(TaxIdError::Empty));
    }

    #[test]
    fn test_parse_rejects_all_zeros() {
        assert_eq!(
            TaxId::parse("000.000.000-00"),
            Err(TaxIdError::RepeatedDigit)
        );
    }

    #[test]
    fn test_parse_rejects_repeated_digit() {
        assert_eq!(TaxId::parse("11111111111"), Err(TaxIdError::RepeatedDigit));
    }
}

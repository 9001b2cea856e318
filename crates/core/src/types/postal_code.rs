//! Postal code (CEP) type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a CEP.
const CEP_DIGITS: usize = 8;

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// The input contains no digits.
    #[error("postal code cannot be empty")]
    Empty,
    /// Wrong number of digits.
    #[error("postal code must have exactly {expected} digits, got {got}")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digits found in the input.
        got: usize,
    },
}

/// An 8-digit Brazilian CEP, stored as its digit string.
///
/// Accepts formatted input ("01310-100") and keeps only the digits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse a `PostalCode` from free-form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not contain exactly 8 digits.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PostalCodeError::Empty);
        }
        if digits.len() != CEP_DIGITS {
            return Err(PostalCodeError::WrongLength {
                expected: CEP_DIGITS,
                got: digits.len(),
            });
        }

        Ok(Self(digits))
    }

    /// Returns the bare 8-digit string.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_hyphen() {
        let cep = PostalCode::parse("01310-100").unwrap();
        assert_eq!(cep.digits(), "01310100");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(
            PostalCode::parse("0131010"),
            Err(PostalCodeError::WrongLength { got: 7, .. })
        ));
        assert_eq!(PostalCode::parse("abc"), Err(PostalCodeError::Empty));
    }
}

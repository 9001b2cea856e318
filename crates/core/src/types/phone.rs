//! Phone number type.
//!
//! Carriers require a contact phone on both ends of a shipment; the chat
//! notification channel additionally needs an E.164 destination. Input
//! arrives in whatever shape the customer typed ("(11) 98765-4321",
//! "+55 11 98765 4321"), so parsing keeps only the digits.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Minimum number of digits for a dialable phone (area code + number).
const MIN_DIGITS: usize = 10;

/// Maximum number of digits (country code + area code + number).
const MAX_DIGITS: usize = 13;

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input contains no digits at all.
    #[error("phone cannot be empty")]
    Empty,
    /// Too few digits to be dialable.
    #[error("phone must have at least {min} digits, got {got}")]
    TooShort {
        /// Minimum digit count.
        min: usize,
        /// Digits found in the input.
        got: usize,
    },
    /// Too many digits.
    #[error("phone must have at most {max} digits, got {got}")]
    TooLong {
        /// Maximum digit count.
        max: usize,
        /// Digits found in the input.
        got: usize,
    },
}

/// A phone number stored as its digit string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Parse a `Phone` from free-form input, keeping only digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has fewer than 10 or more than 13
    /// digits after stripping formatting.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }
        if digits.len() < MIN_DIGITS {
            return Err(PhoneError::TooShort {
                min: MIN_DIGITS,
                got: digits.len(),
            });
        }
        if digits.len() > MAX_DIGITS {
            return Err(PhoneError::TooLong {
                max: MAX_DIGITS,
                got: digits.len(),
            });
        }

        Ok(Self(digits))
    }

    /// Returns the bare digit string.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Returns the number in E.164 form, prefixing the Brazilian country
    /// code when the input did not carry one.
    #[must_use]
    pub fn e164(&self) -> String {
        if self.0.starts_with("55") && self.0.len() >= 12 {
            format!("+{}", self.0)
        } else {
            format!("+55{}", self.0)
        }
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

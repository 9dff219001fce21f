//! Phone number type for delivery addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Wrong number of characters.
    #[error("phone number must be exactly {expected} digits")]
    WrongLength {
        /// Required number of digits.
        expected: usize,
    },
    /// Contains something other than ASCII digits.
    #[error("phone number may only contain digits")]
    NonDigit,
}

/// A ten-digit delivery phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Number of digits a phone number must have.
    pub const LENGTH: usize = 10;

    /// Parse a phone number, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is exactly ten ASCII digits.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        let s = input.trim();
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::NonDigit);
        }
        if s.len() != Self::LENGTH {
            return Err(PhoneError::WrongLength {
                expected: Self::LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ten_digits() {
        assert!(Phone::parse("9876543210").is_ok());
        assert!(Phone::parse(" 9876543210 ").is_ok());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            Phone::parse("98765"),
            Err(PhoneError::WrongLength { expected: 10 })
        );
        assert_eq!(
            Phone::parse("98765432101"),
            Err(PhoneError::WrongLength { expected: 10 })
        );
        assert_eq!(
            Phone::parse(""),
            Err(PhoneError::WrongLength { expected: 10 })
        );
    }

    #[test]
    fn test_rejects_non_digits() {
        assert_eq!(Phone::parse("98765-4321"), Err(PhoneError::NonDigit));
        assert_eq!(Phone::parse("+919876543"), Err(PhoneError::NonDigit));
    }
}

//! Delivery address records and the new-address form.

use serde::{Deserialize, Serialize};

use super::{AddressId, Phone, PhoneError};

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub address: String,
    pub phone: String,
}

/// Errors from validating a new address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Street address is missing or too short to deliver to.
    #[error("address must be longer than {min} characters")]
    TooShort {
        /// Characters the trimmed address must exceed.
        min: usize,
    },
    /// Phone number failed validation.
    #[error(transparent)]
    Phone(#[from] PhoneError),
}

/// A validated `POST /api/address/new` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAddress {
    address: String,
    phone: Phone,
}

impl NewAddress {
    /// The trimmed address must be longer than this many characters.
    pub const MIN_ADDRESS_LENGTH: usize = 5;

    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed address is five characters or fewer,
    /// or the phone is not exactly ten digits.
    pub fn parse(address: &str, phone: &str) -> Result<Self, AddressError> {
        let address = address.trim();
        if address.chars().count() <= Self::MIN_ADDRESS_LENGTH {
            return Err(AddressError::TooShort {
                min: Self::MIN_ADDRESS_LENGTH,
            });
        }
        let phone = Phone::parse(phone)?;
        Ok(Self {
            address: address.to_owned(),
            phone,
        })
    }

    /// The trimmed street address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The validated phone number.
    #[must_use]
    pub const fn phone(&self) -> &Phone {
        &self.phone
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address_is_trimmed() {
        let addr = NewAddress::parse("  12 MG Road, Pune  ", "9876543210").unwrap();
        assert_eq!(addr.address(), "12 MG Road, Pune");
        assert_eq!(
            serde_json::to_value(&addr).unwrap(),
            serde_json::json!({"address": "12 MG Road, Pune", "phone": "9876543210"})
        );
    }

    #[test]
    fn test_short_address_rejected() {
        assert_eq!(
            NewAddress::parse("  abcde   ", "9876543210"),
            Err(AddressError::TooShort { min: 5 })
        );
        assert!(NewAddress::parse("abcdef", "9876543210").is_ok());
    }

    #[test]
    fn test_bad_phone_rejected() {
        assert!(matches!(
            NewAddress::parse("12 MG Road, Pune", "12345"),
            Err(AddressError::Phone(PhoneError::WrongLength { .. }))
        ));
    }
}

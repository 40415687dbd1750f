//! Delivery address input and validation.

use serde::{Deserialize, Serialize};

use super::email::{Email, EmailError};

/// Errors produced when validating submitted address fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// One or more required fields were absent or blank.
    #[error("missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    /// A field exceeded its column length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Offending field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// The email field did not parse.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Raw address fields as submitted by a checkout or address-book form.
///
/// Every field is optional at this stage so that validation can report all
/// missing fields at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// A fully validated address, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidAddress {
    pub full_name: String,
    pub email: Email,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

/// Column limits, in field order.
const LIMITS: [(&str, usize); 8] = [
    ("full_name", 255),
    ("email", Email::MAX_LENGTH),
    ("street", 255),
    ("city", 100),
    ("state", 100),
    ("postal_code", 20),
    ("country", 100),
    ("phone", 15),
];

impl AddressFields {
    /// Validate the submission.
    ///
    /// Blank values count as missing. Values are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Missing`] naming every missing field (in form
    /// order), otherwise the first length or email problem found.
    pub fn validate(&self) -> Result<ValidAddress, AddressError> {
        let values = [
            &self.full_name,
            &self.email,
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
            &self.phone,
        ]
        .map(|v| v.as_deref().map(str::trim).filter(|s| !s.is_empty()));

        let missing: Vec<&'static str> = LIMITS
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_none())
            .map(|((name, _), _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AddressError::Missing(missing));
        }

        for ((field, max), value) in LIMITS.iter().zip(values.iter()) {
            if value.is_some_and(|v| v.chars().count() > *max) {
                return Err(AddressError::TooLong { field, max: *max });
            }
        }

        let [
            Some(full_name),
            Some(email),
            Some(street),
            Some(city),
            Some(state),
            Some(postal_code),
            Some(country),
            Some(phone),
        ] = values
        else {
            return Err(AddressError::Missing(Vec::new()));
        };

        Ok(ValidAddress {
            full_name: full_name.to_owned(),
            email: Email::parse(email)?,
            street: street.to_owned(),
            city: city.to_owned(),
            state: state.to_owned(),
            postal_code: postal_code.to_owned(),
            country: country.to_owned(),
            phone: phone.to_owned(),
        })
    }
}

impl ValidAddress {
    /// Whether two addresses are the same delivery point for deduplication.
    ///
    /// Email is deliberately not part of the identity: a saved address is
    /// matched on recipient, phone and location only.
    #[must_use]
    pub fn same_location(&self, other: &Self) -> bool {
        self.full_name == other.full_name
            && self.phone == other.phone
            && self.street == other.street
            && self.city == other.city
            && self.state == other.state
            && self.postal_code == other.postal_code
            && self.country == other.country
    }
}

impl From<ValidAddress> for AddressFields {
    fn from(a: ValidAddress) -> Self {
        Self {
            full_name: Some(a.full_name),
            email: Some(a.email.into_inner()),
            street: Some(a.street),
            city: Some(a.city),
            state: Some(a.state),
            postal_code: Some(a.postal_code),
            country: Some(a.country),
            phone: Some(a.phone),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete() -> AddressFields {
        AddressFields {
            full_name: Some("Ada Lovelace".into()),
            email: Some("ada@example.com".into()),
            street: Some("12 St James's Square".into()),
            city: Some("London".into()),
            state: Some("Greater London".into()),
            postal_code: Some("SW1Y 4JH".into()),
            country: Some("UK".into()),
            phone: Some("+44 20 7946".into()),
        }
    }

    #[test]
    fn test_complete_fields_validate_and_trim() {
        let mut fields = complete();
        fields.city = Some("  London  ".into());
        let valid = fields.validate().unwrap();
        assert_eq!(valid.city, "London");
        assert_eq!(valid.email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_missing_fields_are_all_named() {
        let fields = AddressFields {
            street: Some("   ".into()),
            phone: None,
            ..complete()
        };
        assert_eq!(
            fields.validate(),
            Err(AddressError::Missing(vec!["street", "phone"]))
        );

        let Err(AddressError::Missing(all)) = AddressFields::default().validate() else {
            panic!("expected missing error");
        };
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_invalid_email_rejected() {
        let fields = AddressFields {
            email: Some("not-an-email".into()),
            ..complete()
        };
        assert!(matches!(
            fields.validate(),
            Err(AddressError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_phone_length_limit() {
        let fields = AddressFields {
            phone: Some("1".repeat(16)),
            ..complete()
        };
        assert_eq!(
            fields.validate(),
            Err(AddressError::TooLong {
                field: "phone",
                max: 15
            })
        );
    }

    #[test]
    fn test_same_location_ignores_email() {
        let a = complete().validate().unwrap();
        let b = AddressFields {
            email: Some("other@example.com".into()),
            ..complete()
        }
        .validate()
        .unwrap();
        assert!(a.same_location(&b));

        let c = AddressFields {
            street: Some("1 Other Road".into()),
            ..complete()
        }
        .validate()
        .unwrap();
        assert!(!a.same_location(&c));
    }
}

pub mod contact;
pub mod financing;

use crate::configuration::MailSettings;
use crate::mailer::MailError;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

lazy_static! {
    pub static ref PHONE: Regex = Regex::new(r"^\(\d{3}\)\s\d{3}-\d{4}$").unwrap();
    pub static ref SSN: Regex = Regex::new(r"^\d{3}-\d{2}-\d{4}$").unwrap();
    pub static ref ZIP: Regex = Regex::new(r"^\d{5}(-\d{4})?$").unwrap();
    pub static ref LICENSE_EXPIRY: Regex = Regex::new(r"^(0[1-9]|1[0-2])/?([0-9]{2})$").unwrap();
    pub static ref VIN: Regex = Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap();
}

/// Accumulates field errors on top of the derived `Validate` result.
pub(crate) struct FieldChecks(ValidationErrors);

impl FieldChecks {
    pub fn start(derived: Result<(), ValidationErrors>) -> Self {
        Self(derived.err().unwrap_or_default())
    }

    pub fn require(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            let mut error = ValidationError::new("invalid");
            error.message = Some(Cow::from(message));
            self.0.add(field, error);
        }
    }

    /// Folds another struct's field errors into this one.
    pub fn absorb(&mut self, nested: Result<(), ValidationErrors>) {
        if let Err(nested) = nested {
            for (field, errors) in nested.field_errors() {
                for error in errors {
                    self.0.add(field, error.clone());
                }
            }
        }
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.errors().is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

pub(crate) fn int_between(raw: &str, min: i64, max: i64) -> bool {
    raw.trim()
        .parse::<i64>()
        .map_or(false, |value| (min..=max).contains(&value))
}

pub(crate) fn number_at_least(raw: &str, min: f64) -> bool {
    raw.trim()
        .parse::<f64>()
        .map_or(false, |value| value.is_finite() && value >= min)
}

pub(crate) fn is_checked(raw: &str) -> bool {
    raw.trim() == "on"
}

pub(crate) fn is_true(raw: &str) -> bool {
    raw.trim() == "true"
}

pub(crate) fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// Mailbox that receives lead notifications.
pub fn staff_recipient(settings: &MailSettings) -> Result<&str, MailError> {
    settings.staff_recipient().ok_or(MailError::MissingRecipient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns() {
        assert!(PHONE.is_match("(774) 523-7860"));
        assert!(!PHONE.is_match("774-523-7860"));
        assert!(SSN.is_match("123-45-6789"));
        assert!(ZIP.is_match("02134-1234"));
        assert!(!ZIP.is_match("0213"));
        assert!(LICENSE_EXPIRY.is_match("09/27"));
        assert!(!LICENSE_EXPIRY.is_match("13/27"));
        assert!(VIN.is_match("1HGCM82633A004352"));
        assert!(!VIN.is_match("1HGCM82633A00435O"));
    }

    #[test]
    fn numeric_helpers() {
        assert!(int_between("11", 0, 11));
        assert!(!int_between("12", 0, 11));
        assert!(!int_between("1.5", 0, 11));
        assert!(number_at_least("0", 0.0));
        assert!(!number_at_least("-1", 0.0));
        assert!(!number_at_least("NaN", 0.0));
    }

    #[test]
    fn checks_merge_with_derived_errors() {
        let mut checks = FieldChecks::start(Ok(()));
        checks.require(true, "email", "unused");
        assert!(checks.finish().is_ok());

        let mut checks = FieldChecks::start(Ok(()));
        checks.require(false, "phone", "Phone must be in format (XXX) XXX-XXXX");
        let errors = checks.finish().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
    }
}

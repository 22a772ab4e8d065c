/*!
 * Input Validation Module
 *
 * Centralized validation for the enrollment identity form.
 * Capture may not begin while any identity field is invalid.
 */
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Value too long: max {max}, got {actual}")]
    ValueTooLong { max: usize, actual: usize },
}

const EMAIL_MAX_LEN: usize = 254;
const NAME_MAX_LEN: usize = 128;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z ]{2,}$").expect("valid name regex"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"))
}

/// Validate email address (local@domain.tld, no whitespace)
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > EMAIL_MAX_LEN {
        return Err(ValidationError::ValueTooLong {
            max: EMAIL_MAX_LEN,
            actual: email.len(),
        });
    }

    if !email_pattern().is_match(email) {
        return Err(ValidationError::InvalidFormat(
            "Email must look like name@example.com".to_string(),
        ));
    }

    Ok(())
}

/// Validate display name (ASCII letters and spaces, at least 2 characters)
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > NAME_MAX_LEN {
        return Err(ValidationError::ValueTooLong {
            max: NAME_MAX_LEN,
            actual: name.len(),
        });
    }

    if !name_pattern().is_match(name) {
        return Err(ValidationError::InvalidFormat(
            "Name can only contain letters and spaces (min 2)".to_string(),
        ));
    }

    Ok(())
}

/// Validate phone number (exactly 10 digits)
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if !phone_pattern().is_match(phone) {
        return Err(ValidationError::InvalidFormat(
            "Mobile number must be exactly 10 digits".to_string(),
        ));
    }

    Ok(())
}

/// Identity form field names as sent by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Email,
    DisplayName,
    PhoneNumber,
}

impl FormField {
    /// Wire name used in the registration request
    pub fn wire_name(&self) -> &'static str {
        match self {
            FormField::Email => "email",
            FormField::DisplayName => "name",
            FormField::PhoneNumber => "mobile",
        }
    }
}

impl FromStr for FormField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(FormField::Email),
            "name" | "display_name" | "displayName" => Ok(FormField::DisplayName),
            "mobile" | "phone" | "phone_number" | "phoneNumber" => Ok(FormField::PhoneNumber),
            _ => Err(ValidationError::InvalidFormat(format!(
                "Unknown form field '{}'",
                s
            ))),
        }
    }
}

/// Enrollment identity form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityForm {
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
}

impl IdentityForm {
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Email => self.email = value,
            FormField::DisplayName => self.display_name = value,
            FormField::PhoneNumber => self.phone_number = value,
        }
    }

    /// Every failing field with its validation error
    pub fn errors(&self) -> Vec<(FormField, ValidationError)> {
        let checks = [
            (FormField::Email, validate_email(&self.email)),
            (FormField::DisplayName, validate_display_name(&self.display_name)),
            (FormField::PhoneNumber, validate_phone_number(&self.phone_number)),
        ];

        checks
            .into_iter()
            .filter_map(|(field, result)| result.err().map(|e| (field, e)))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

/// Input validators for client-supplied identity fields.
///
/// Length limits guard against oversized inputs; format checks reject
/// malformed emails and phone numbers before they reach the store.

use lazy_static::lazy_static;
use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // Ten digits, no separators or country code.
    static ref PHONE_REGEX: Regex = Regex::new(r"^\d{10}$").unwrap();
}

/// Validates and normalizes an email address.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }
    // Local part longer than 64 octets is invalid per RFC 5321
    if let Some(at_pos) = trimmed.find('@') {
        if trimmed[..at_pos].len() > 64 {
            return Err(ValidationError::InvalidFormat("email"));
        }
    }

    Ok(trimmed.to_lowercase())
}

/// Validates a display name.
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name", MAX_NAME_LENGTH));
    }
    if trimmed.contains('\0') || trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("name"));
    }

    Ok(trimmed.to_string())
}

/// Validates a 10-digit phone number.
pub fn is_valid_phone_number(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("phone number"));
    }
    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("phone number"));
    }

    Ok(trimmed.to_string())
}

#[derive(Debug)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

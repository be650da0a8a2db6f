//! Per-value validation rules.
//!
//! Each rule returns `Result<(), ValidationError>`. The error carries the
//! configured user-facing message and a rule code (`required`,
//! `invalid_email`, `invalid_phone`, `invalid_url`) so the field validator
//! can tell the generic required failure apart from a specific one.

use once_cell::sync::Lazy;
use regex::Regex;

use quadratum_core::{MessageSettings, ValidationError};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

static TEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+()\-.\s]{7,}$").expect("valid regex"));

/// Rejects an empty value when required.
pub fn check_required(
    value: &str,
    required: bool,
    messages: &MessageSettings,
) -> Result<(), ValidationError> {
    if required && value.is_empty() {
        return Err(ValidationError::new(&messages.required, "required"));
    }
    Ok(())
}

/// Validates an email address (`local@domain.tld`, no whitespace).
pub fn check_email(value: &str, messages: &MessageSettings) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(&messages.invalid_email, "invalid_email").with_param("value", value))
    }
}

/// Validates a phone number: seven or more digits and `+ ( ) - .` or spaces.
pub fn check_phone(value: &str, messages: &MessageSettings) -> Result<(), ValidationError> {
    if TEL_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(&messages.invalid_phone, "invalid_phone").with_param("value", value))
    }
}

/// Validates an absolute URL with a strict parser.
///
/// Parse failures never escape as anything but a `ValidationError`.
pub fn check_url(value: &str, messages: &MessageSettings) -> Result<(), ValidationError> {
    url::Url::parse(value).map(|_| ()).map_err(|e| {
        ValidationError::new(&messages.invalid_url, "invalid_url").with_param("reason", e.to_string())
    })
}

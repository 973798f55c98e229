use chrono::{DateTime, Utc};
use thiserror::Error;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a valid email")]
    InvalidEmail(&'static str),

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Terms must be accepted")]
    TermsNotAccepted,

    #[error("Price must be a positive number")]
    InvalidPrice,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("{end} must be after {start}")]
    InvalidRange {
        start: &'static str,
        end: &'static str,
    },

    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
}

/// Validator for request payloads.
pub struct Validator;

impl Validator {
    /// Reject empty or whitespace-only strings.
    pub fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::Required(field));
        }
        Ok(())
    }

    /// Like [`Validator::required`], but only when a value was supplied.
    pub fn not_blank(field: &'static str, value: &Option<String>) -> Result<(), ValidationError> {
        match value {
            Some(v) => Self::required(field, v),
            None => Ok(()),
        }
    }

    /// Structural email check: one `@`, non-empty local part, dotted domain.
    pub fn email(field: &'static str, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        let Some((local, domain)) = value.split_once('@') else {
            return Err(ValidationError::InvalidEmail(field));
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@');
        if local.is_empty() || !domain_ok || value.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidEmail(field));
        }
        Ok(())
    }

    pub fn password(password: &str, confirm: &str) -> Result<(), ValidationError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if password != confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    pub fn price(price: f64) -> Result<(), ValidationError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::InvalidPrice);
        }
        Ok(())
    }

    pub fn rating(rating: i64) -> Result<(), ValidationError> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::InvalidRating);
        }
        Ok(())
    }

    /// Require `end` to be strictly after `start`.
    pub fn date_range(
        start_field: &'static str,
        start: DateTime<Utc>,
        end_field: &'static str,
        end: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidRange {
                start: start_field,
                end: end_field,
            });
        }
        Ok(())
    }
}

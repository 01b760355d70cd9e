//! crates/lam_phuong_core/src/validation.rs
//!
//! Local sign-in form validation. Nothing that fails here is ever sent to
//! the remote API.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::Credentials;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// One failed password strength check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordDeficiency {
    TooShort,
    MissingLowercase,
    MissingUppercase,
    MissingDigit,
    MissingSpecial,
}

impl PasswordDeficiency {
    pub fn message(self) -> String {
        match self {
            PasswordDeficiency::TooShort => {
                format!("Password must be at least {} characters long", MIN_PASSWORD_LENGTH)
            }
            PasswordDeficiency::MissingLowercase => {
                "Password must contain at least one lowercase letter".to_string()
            }
            PasswordDeficiency::MissingUppercase => {
                "Password must contain at least one uppercase letter".to_string()
            }
            PasswordDeficiency::MissingDigit => {
                "Password must contain at least one digit".to_string()
            }
            PasswordDeficiency::MissingSpecial => {
                "Password must contain at least one special character".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in a sign-in form, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

/// Runs all five strength checks and returns every failure.
pub fn password_deficiencies(password: &str) -> Vec<PasswordDeficiency> {
    let mut missing = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        missing.push(PasswordDeficiency::TooShort);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push(PasswordDeficiency::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push(PasswordDeficiency::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push(PasswordDeficiency::MissingDigit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        missing.push(PasswordDeficiency::MissingSpecial);
    }
    missing
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if credentials.email.trim().is_empty() {
        errors.push(FieldError {
            field: "email",
            message: "Email is required".to_string(),
        });
    } else if !is_valid_email(&credentials.email) {
        errors.push(FieldError {
            field: "email",
            message: "Email address is not valid".to_string(),
        });
    }

    if credentials.password.is_empty() {
        errors.push(FieldError {
            field: "password",
            message: "Password is required".to_string(),
        });
    } else {
        errors.extend(
            password_deficiencies(&credentials.password)
                .into_iter()
                .map(|d| FieldError {
                    field: "password",
                    message: d.message(),
                }),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

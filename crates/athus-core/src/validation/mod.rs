//! Client-side validation for the signup, registration and profile forms.
//!
//! - `cpf`: CPF check-digit validation
//! - `date`: `DD/MM/YYYY` birth dates with a minimum age, ISO conversion
//! - `form`: field rules and whole-form validators
//!
//! Form validators collect every failing field into `FieldErrors` instead
//! of stopping at the first one, so a screen can flag all fields at once.

pub mod cpf;
pub mod date;
pub mod form;

use std::fmt;

use thiserror::Error;

pub use cpf::is_valid_cpf;
pub use date::{br_date_to_iso, is_valid_birth_date, iso_to_br_date, parse_br_date};
pub use form::{
    is_profile_complete, validate_password_change, validate_profile_edit, validate_registration,
    validate_sign_up, RegistrationForm, SignUpForm,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required")]
    Required,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("enter first and last name")]
    InvalidFullName,

    #[error("phone must look like (00) 9 0000-0000")]
    InvalidPhone,

    #[error("CEP must look like 00000-000")]
    InvalidCep,

    #[error("invalid CPF")]
    InvalidCpf,

    #[error("date must be a real DD/MM/YYYY date")]
    InvalidDate,

    #[error("must be at least {0} years old")]
    TooYoung(u32),

    #[error("must be at least {0} characters")]
    TooShort(usize),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("must be a number")]
    NotANumber,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {error}")]
pub struct FieldError {
    pub field: &'static str,
    pub error: ValidationError,
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, error: ValidationError) {
        self.0.push(FieldError { field, error });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First error reported for a field
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field == field).map(|e| &e.error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(value)` when nothing failed
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

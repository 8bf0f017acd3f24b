//! Validation Traits
//!
//! Input checks shared by the procedure inputs. Failures are collected per
//! field so a single response can list every offending field.

use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};

/// Per-field validation messages, accumulated before responding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record the outcome of a single check.
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise a BAD_REQUEST error
    /// carrying `details.fieldErrors`.
    pub fn into_result(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_failed(self.errors))
        }
    }
}

/// Trait for validating non-empty strings.
///
/// Whitespace-only values count as empty.
pub trait ValidateNonEmpty {
    fn validate_non_empty(&self, message: &str) -> Result<(), String>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, message: &str) -> Result<(), String> {
        if self.trim().is_empty() {
            return Err(message.to_string());
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, message: &str) -> Result<(), String> {
        self.as_str().validate_non_empty(message)
    }
}

/// Absent optional values pass; present ones must be non-empty.
impl<T: ValidateNonEmpty> ValidateNonEmpty for Option<T> {
    fn validate_non_empty(&self, message: &str) -> Result<(), String> {
        match self {
            Some(value) => value.validate_non_empty(message),
            None => Ok(()),
        }
    }
}

/// Trait for validating numeric ranges.
pub trait ValidateRange {
    /// Validate that the value is within an inclusive range.
    fn validate_range(&self, min: Self, max: Self) -> Result<(), String>
    where
        Self: Sized;

    /// Validate that the value is at least `min`.
    fn validate_min(&self, min: Self) -> Result<(), String>
    where
        Self: Sized;
}

macro_rules! impl_validate_range {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                fn validate_range(&self, min: Self, max: Self) -> Result<(), String> {
                    if *self < min || *self > max {
                        return Err(format!("Must be between {} and {}", min, max));
                    }
                    Ok(())
                }

                fn validate_min(&self, min: Self) -> Result<(), String> {
                    if *self < min {
                        return Err(format!("Must be greater than or equal to {}", min));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_range!(i32, i64, u32, u64);

/// Trait for checking if an update input has any fields set.
pub trait HasUpdates {
    /// Check if any update fields are set.
    fn has_any_updates(&self) -> bool;

    /// Validate that at least one update field is set.
    fn validate_has_updates(&self) -> ApiResult<()> {
        if !self.has_any_updates() {
            return Err(ApiError::bad_request(
                "At least one field must be provided for update",
            ));
        }
        Ok(())
    }
}

/// Implemented by every procedure input.
pub trait Validate {
    fn validate(&self) -> ApiResult<()>;
}

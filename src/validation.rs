//! Validation Support
//!
//! Update values are validated per property. Each failure names the property
//! twice: by the field name used in the serialized entity (`Property`) and by
//! its display name (`Name`). Entities can add their own rules by overriding
//! [`Validatable::validate`].
//!
//! # Example
//!
//! ```rust,ignore
//! use crudmvc::validation::{Validatable, ValidationError, ValidationErrors};
//!
//! impl Validatable for Model {
//!     fn validate(&self) -> Result<(), ValidationErrors> {
//!         let mut errors = ValidationErrors::new();
//!         if self.title.starts_with(' ') {
//!             errors.add(ValidationError::new("title", "Title", "Title cannot start with a space"));
//!         }
//!         errors.result()
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Validation error for one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationError {
    /// Field name of the property in the serialized entity
    #[serde(rename = "Property")]
    pub property: String,
    /// Display name of the property
    #[serde(rename = "Name")]
    pub name: String,
    /// Human-readable error message
    #[serde(rename = "ErrorMessage")]
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(
        property: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Append every error of another collection
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Whether a property already has an error
    #[must_use]
    pub fn contains(&self, property: &str) -> bool {
        self.errors.iter().any(|e| e.property == property)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Convert to Result
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was collected.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Entity-level validation, run after the request values were bound
pub trait Validatable {
    /// Return `Ok(())` if valid, or every rule the entity breaks.
    ///
    /// # Errors
    ///
    /// Returns the collected validation errors.
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Helper validators for common patterns
pub mod validators {
    use super::ValidationError;
    use crate::metadata::PropertyMetadata;
    use std::fmt;

    fn error(property: &PropertyMetadata, message: String) -> ValidationError {
        ValidationError::new(property.clr_name.clone(), property.name.clone(), message)
    }

    /// Validate string length is within range
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the length (in characters) is out of range.
    pub fn validate_length(
        property: &PropertyMetadata,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<(), ValidationError> {
        let len = value.chars().count();

        if let Some(min_len) = min
            && len < min_len
        {
            return Err(error(
                property,
                format!("{} must be at least {min_len} characters", property.name),
            ));
        }

        if let Some(max_len) = max
            && len > max_len
        {
            return Err(error(
                property,
                format!("{} must be at most {max_len} characters", property.name),
            ));
        }

        Ok(())
    }

    /// Validate number is within range
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the value is out of range.
    pub fn validate_range<T: PartialOrd + fmt::Display>(
        property: &PropertyMetadata,
        value: T,
        min: Option<T>,
        max: Option<T>,
    ) -> Result<(), ValidationError> {
        if let Some(min_val) = min
            && value < min_val
        {
            return Err(error(
                property,
                format!("{} must be at least {min_val}", property.name),
            ));
        }

        if let Some(max_val) = max
            && value > max_val
        {
            return Err(error(
                property,
                format!("{} must be at most {max_val}", property.name),
            ));
        }

        Ok(())
    }

    /// Basic email validation
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the address is malformed.
    pub fn validate_email(property: &PropertyMetadata, value: &str) -> Result<(), ValidationError> {
        if !value.contains('@') || !value.contains('.') {
            return Err(error(property, format!("{} is not a valid email address", property.name)));
        }
        validate_length(property, value, None, Some(255))
    }

    /// Validate value is not empty
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the value is blank.
    pub fn validate_required(
        property: &PropertyMetadata,
        value: &str,
    ) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(error(property, format!("{} is required", property.name)));
        }
        Ok(())
    }
}

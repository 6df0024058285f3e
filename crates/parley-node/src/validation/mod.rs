//! # Input Validation Module
//!
//! Validation for all API payloads:
//!
//! - Message and chat content
//! - Identifiers (user ids, guest ids, conversation and room ids)
//! - Pagination parameters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use parley_node::validation::validate_identifier;
//!
//! if let Err(e) = validate_identifier("cust_42") {
//!     println!("Invalid identifier: {}", e);
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use validator::{ValidateEmail, ValidationError, ValidationErrors};

/// Identifiers accepted at the boundary.
pub static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:@-]+$").expect("Invalid regex"));

/// Maximum message or chat content length, in characters.
pub const MAX_CONTENT_LENGTH: usize = 10_000;
/// Maximum identifier length.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validation error response.
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    /// Error type.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Field-level error details.
    pub details: Vec<FieldError>,
}

/// Field-level validation error.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    code: e.code.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Validation failed for field '{}'", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = details
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "Validation failed".to_string());

        ValidationErrorResponse {
            error: "validation_error".to_string(),
            message,
            details,
        }
    }
}

/// Collects field errors from several checks into one `ValidationErrors`.
#[derive(Debug)]
pub struct FieldChecks {
    errors: ValidationErrors,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    /// Record the outcome of validating `field`.
    pub fn check(mut self, field: &'static str, result: Result<(), ValidationError>) -> Self {
        if let Err(e) = result {
            self.errors.add(field, e);
        }
        self
    }

    /// Finish, returning an error response if any check failed.
    pub fn finish(self) -> Result<(), ValidationErrorResponse> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors.into())
        }
    }
}

impl Default for FieldChecks {
    fn default() -> Self {
        Self::new()
    }
}

fn error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into().into());
    err
}

/// Validate message or chat content: non-blank and bounded.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(error("required", "Content is required"));
    }

    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(error(
            "length",
            format!("Content must be at most {} characters", MAX_CONTENT_LENGTH),
        ));
    }

    Ok(())
}

/// Validate an identifier.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(error("required", "Identifier is required"));
    }

    if id.len() > MAX_IDENTIFIER_LENGTH {
        return Err(error(
            "length",
            format!("Identifier must be at most {} characters", MAX_IDENTIFIER_LENGTH),
        ));
    }

    if !IDENTIFIER_REGEX.is_match(id) {
        return Err(error(
            "pattern",
            "Identifier may contain only letters, numbers and _ . : @ -",
        ));
    }

    Ok(())
}

/// Validate an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(error("required", "Email is required"));
    }

    if !email.validate_email() {
        return Err(error("email", "Email address is invalid"));
    }

    Ok(())
}

/// Validate an optional identifier; `None` passes.
pub fn validate_optional_identifier(id: Option<&str>) -> Result<(), ValidationError> {
    match id {
        Some(id) => validate_identifier(id),
        None => Ok(()),
    }
}

/// Validate pagination: page is one-based, limit in `1..=max_limit`.
pub fn validate_page(page: usize, limit: usize, max_limit: usize) -> Result<(), ValidationError> {
    if page == 0 {
        return Err(error("range", "page must be at least 1"));
    }

    if limit == 0 || limit > max_limit {
        return Err(error(
            "range",
            format!("limit must be between 1 and {}", max_limit),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        assert!(validate_content("Hello").is_ok());
        assert!(validate_content("").is_err());
        assert!(validate_content("   \n").is_err());
        assert!(validate_content(&"a".repeat(MAX_CONTENT_LENGTH)).is_ok());
        assert!(validate_content(&"a".repeat(MAX_CONTENT_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("cust_1").is_ok());
        assert!(validate_identifier("guest_ab12cd34ef56").is_ok());
        assert!(validate_identifier("ann@example.com").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier("../etc").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ann+orders@shop.test").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1, 50, 100).is_ok());
        assert!(validate_page(0, 50, 100).is_err());
        assert!(validate_page(1, 0, 100).is_err());
        assert!(validate_page(1, 101, 100).is_err());
    }

    #[test]
    fn test_field_checks_collects_errors() {
        let result = FieldChecks::new()
            .check("content", validate_content(""))
            .check("senderId", validate_identifier("ok"))
            .finish();

        let response = result.unwrap_err();
        assert_eq!(response.error, "validation_error");
        assert_eq!(response.details.len(), 1);
        assert_eq!(response.details[0].field, "content");
        assert_eq!(response.details[0].code, "required");
        assert_eq!(response.message, "Content is required");
    }

    #[test]
    fn test_field_checks_pass() {
        assert!(FieldChecks::new()
            .check("userId", validate_identifier("u1"))
            .finish()
            .is_ok());
    }
}

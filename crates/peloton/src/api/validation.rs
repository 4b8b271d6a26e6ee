//! Field validation shared by the services.

use serde_json::json;

use super::{ApiError, ApiResult};

/// Validation failure naming the offending field in `details`.
pub fn field_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::validation_failed(message).with_details(json!({ "field": field }))
}

/// Identifiers are positive integers.
pub fn validate_id(field: &str, id: i64) -> ApiResult<()> {
    if id <= 0 {
        return Err(field_error(field, format!("{field} must be a positive integer")));
    }
    Ok(())
}

/// Length in characters after trimming, inclusive bounds.
pub fn validate_len(field: &str, value: &str, min: usize, max: usize) -> ApiResult<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        let message = if min == max {
            format!("{field} must be exactly {min} characters")
        } else {
            format!("{field} must be between {min} and {max} characters")
        };
        return Err(field_error(field, message));
    }
    Ok(())
}

pub fn validate_range<T>(field: &str, value: T, min: T, max: T) -> ApiResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(field_error(
            field,
            format!("{field} must be between {min} and {max}"),
        ));
    }
    Ok(())
}

/// Finite amount within inclusive bounds.
pub fn validate_amount(field: &str, value: f64, min: f64, max: f64) -> ApiResult<()> {
    if !value.is_finite() {
        return Err(field_error(field, format!("{field} must be a number")));
    }
    validate_range(field, value, min, max)
}

/// Basic email validation.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("jelle.leus@hogent.be"));
        assert!(is_valid_email("Magnus.Bäckstedt@hotmail.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@hogent.be"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn test_validate_len_messages() {
        assert!(validate_len("abbreviation", "LOD", 3, 3).is_ok());
        let err = validate_len("abbreviation", "LO", 3, 3).unwrap_err();
        assert_eq!(err.message(), "abbreviation must be exactly 3 characters");
        assert_eq!(err.details()["field"], "abbreviation");

        let err = validate_len("name", "   ", 1, 99).unwrap_err();
        assert_eq!(err.message(), "name must be between 1 and 99 characters");
    }

    #[test]
    fn test_validate_amount_rejects_non_finite() {
        assert!(validate_amount("monthly_wage", 5_000.0, 0.0, 1_000_000.0).is_ok());
        let err = validate_amount("monthly_wage", f64::NAN, 0.0, 1_000_000.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.message(), "monthly_wage must be a number");
        assert!(validate_amount("monthly_wage", -1.0, 0.0, 1_000_000.0).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("rider_id", 1).is_ok());
        let err = validate_id("rider_id", 0).unwrap_err();
        assert_eq!(err.message(), "rider_id must be a positive integer");
    }
}

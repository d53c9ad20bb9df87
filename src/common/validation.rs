// Common validation types and traits

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// `Ok(())` when valid, otherwise the result itself for conversion into an API error
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

fn forbidden_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[;<>'"\\]"#).expect("static regex"))
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("static regex")
    })
}

/// Free-text fields reject quote, angle-bracket, semicolon and backslash characters
pub fn has_forbidden_chars(value: &str) -> bool {
    forbidden_chars().is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && email_pattern().is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_chars() {
        assert!(has_forbidden_chars("Robert'); DROP TABLE users;--"));
        assert!(has_forbidden_chars("<script>"));
        assert!(has_forbidden_chars("back\\slash"));
        assert!(!has_forbidden_chars("Ada Lovelace-Byron"));
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@news.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationResult::new().into_result().is_ok());

        let mut failed = ValidationResult::new();
        failed.add_error("email", "Email is required");
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "email");
    }
}

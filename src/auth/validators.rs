// src/auth/validators.rs

use super::models::{LoginRequest, RegisterRequest};
use crate::common::validation::{has_forbidden_chars, is_valid_email};
use crate::common::{ValidationResult, Validator};

pub struct RegisterValidator;

impl Validator<RegisterRequest> for RegisterValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !is_valid_email(data.email.trim()) {
            result.add_error("email", "A valid email address is required");
        }

        validate_name(&data.name, &mut result);
        validate_password(&data.password, &mut result);

        result
    }
}

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !is_valid_email(data.email.trim()) {
            result.add_error("email", "A valid email address is required");
        }
        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        }

        result
    }
}

fn validate_name(name: &str, result: &mut ValidationResult) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        result.add_error("name", "Name is required");
    } else if trimmed.chars().count() > 100 {
        result.add_error("name", "Name must be at most 100 characters");
    } else if has_forbidden_chars(trimmed) {
        result.add_error("name", "Name contains invalid characters");
    }
}

fn validate_password(password: &str, result: &mut ValidationResult) {
    let length = password.chars().count();
    if length < 8 {
        result.add_error("password", "Password must be at least 8 characters");
        return;
    }
    if length > 128 {
        result.add_error("password", "Password must be at most 128 characters");
        return;
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        result.add_error("password", "Password must contain uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        result.add_error("password", "Password must contain lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        result.add_error("password", "Password must contain number");
    }
}

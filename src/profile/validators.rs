// src/profile/validators.rs

use super::models::*;
use crate::common::validation::has_forbidden_chars;
use crate::common::{ValidationResult, Validator};

const MAX_NAME_LENGTH: usize = 100;
const MAX_TEXT_LENGTH: usize = 255;
const MAX_LIST_ITEMS: usize = 10;

// ============================================================================
// Profile Update Validator
// ============================================================================

pub struct ProfileUpdateValidator;

impl Validator<ProfileUpdate> for ProfileUpdateValidator {
    fn validate(&self, data: &ProfileUpdate) -> ValidationResult {
        let mut result = ValidationResult::new();

        for field in ProfileField::ALL {
            if let Some(text) = data.text(field) {
                validate_text(field, text, &mut result);
            }
            if let Some(items) = data.list(field) {
                validate_list(field, items, &mut result);
            }
        }

        if let Some(threshold) = data.credibility_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                result.add_error(
                    "credibility_threshold",
                    "Credibility threshold must be between 0 and 1",
                );
            }
        }

        result
    }
}

fn validate_text(field: ProfileField, text: &str, result: &mut ValidationResult) {
    let trimmed = text.trim();
    let max = if field == ProfileField::Name {
        MAX_NAME_LENGTH
    } else {
        MAX_TEXT_LENGTH
    };

    if field == ProfileField::Name && trimmed.is_empty() {
        result.add_error("name", "Name cannot be empty");
    } else if trimmed.chars().count() > max {
        result.add_error(field.column(), &format!("Must be at most {} characters", max));
    } else if has_forbidden_chars(trimmed) {
        result.add_error(field.column(), "Field contains invalid characters");
    }
}

fn validate_list(field: ProfileField, items: &[String], result: &mut ValidationResult) {
    if items.len() > MAX_LIST_ITEMS {
        result.add_error(
            field.column(),
            &format!("At most {} items allowed", MAX_LIST_ITEMS),
        );
    } else if items.iter().any(|item| has_forbidden_chars(item)) {
        result.add_error(field.column(), "List item contains invalid characters");
    } else if items.iter().any(|item| item.chars().count() > MAX_NAME_LENGTH) {
        result.add_error(
            field.column(),
            &format!("List items must be at most {} characters", MAX_NAME_LENGTH),
        );
    }
}

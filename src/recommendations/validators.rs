// src/recommendations/validators.rs

use super::models::{CreateInteractionRequest, RecommendationQuery};
use crate::common::{ValidationResult, Validator};

const MAX_PAGE: i64 = 10_000;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_TIME_SPENT_SECONDS: i64 = 86_400;

pub struct RecommendationQueryValidator;

impl Validator<RecommendationQuery> for RecommendationQueryValidator {
    fn validate(&self, data: &RecommendationQuery) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.page < 1 || data.page > MAX_PAGE {
            result.add_error("page", "Page must be between 1 and 10000");
        }
        if data.limit < 1 || data.limit > MAX_PAGE_SIZE {
            result.add_error("limit", "Limit must be between 1 and 100");
        }

        result
    }
}

pub struct InteractionValidator;

impl Validator<CreateInteractionRequest> for InteractionValidator {
    fn validate(&self, data: &CreateInteractionRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.article_id < 1 {
            result.add_error("article_id", "Article id must be positive");
        }

        if let Some(seconds) = data.time_spent_seconds {
            if !(0..=MAX_TIME_SPENT_SECONDS).contains(&seconds) {
                result.add_error(
                    "time_spent_seconds",
                    "Time spent must be between 0 and 86400 seconds",
                );
            }
        }

        if let Some(rate) = data.completion_rate {
            if !(0.0..=1.0).contains(&rate) {
                result.add_error("completion_rate", "Completion rate must be between 0 and 1");
            }
        }

        if let Some(depth) = data.scroll_depth {
            if !(0.0..=1.0).contains(&depth) {
                result.add_error("scroll_depth", "Scroll depth must be between 0 and 1");
            }
        }

        if let Some(position) = data.position_in_feed {
            if position < 1 {
                result.add_error("position_in_feed", "Position in feed must be at least 1");
            }
        }

        result
    }
}

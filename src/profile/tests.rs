//! Tests for profile module
//!
//! These tests verify core profile functionality including:
//! - Profile update validation
//! - The update handler against in-memory stores

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::auth::models::NewUser;
    use crate::auth::AuthedUser;
    use crate::common::test_support::test_state;
    use crate::common::{ApiError, AppState, Validator};
    use axum::extract::{Extension, Json};
    use models::ProfileUpdate;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    // ============================================================================
    // Validator Tests
    // ============================================================================

    #[test]
    fn test_profile_validator_valid_data() {
        let update = ProfileUpdate {
            name: Some("Ada".to_string()),
            primary_interests: Some(vec!["science".to_string(), "policy".to_string()]),
            credibility_threshold: Some(0.5),
            ..Default::default()
        };

        let result = validators::ProfileUpdateValidator.validate(&update);
        assert!(result.is_valid, "Valid profile update should pass validation");
    }

    #[test]
    fn test_profile_validator_rejects_forbidden_characters() {
        let update = ProfileUpdate {
            education_level: Some("PhD'; DROP TABLE users;--".to_string()),
            hobbies: Some(vec!["<script>".to_string()]),
            ..Default::default()
        };

        let result = validators::ProfileUpdateValidator.validate(&update);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["education_level", "hobbies"]);
    }

    #[test]
    fn test_profile_validator_limits() {
        let update = ProfileUpdate {
            name: Some("x".repeat(101)),
            topics_to_avoid: Some((0..11).map(|i| format!("topic{}", i)).collect()),
            credibility_threshold: Some(1.5),
            ..Default::default()
        };

        let result = validators::ProfileUpdateValidator.validate(&update);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "topics_to_avoid", "credibility_threshold"]);
    }

    #[test]
    fn test_profile_validator_rejects_blank_name() {
        let update = ProfileUpdate {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!validators::ProfileUpdateValidator.validate(&update).is_valid);
    }

    // ============================================================================
    // Handler Tests
    // ============================================================================

    async fn seeded_user(state: &Arc<RwLock<AppState>>) -> AuthedUser {
        let user_service = state.read().await.user_service.clone();
        let user = user_service
            .create_user(NewUser {
                email: "profile@example.com".to_string(),
                name: "Profile".to_string(),
                password: Some("Secret123".to_string()),
                oauth: None,
                picture_url: None,
            })
            .await
            .unwrap();

        AuthedUser {
            id: user.id,
            email: user.email,
            name: user.name,
            remote_user_id: user.remote_user_id,
        }
    }

    #[tokio::test]
    async fn test_update_profile_handler_applies_fields() {
        let state = test_state(true).await;
        let authed = seeded_user(&state).await;
        let user_id = authed.id;

        let update = ProfileUpdate {
            age_range: Some("25-34".to_string()),
            news_frequency: Some("daily".to_string()),
            ..Default::default()
        };
        let Json(response) =
            handlers::profile::update_profile_handler(Extension(state.clone()), authed, Json(update))
                .await
                .unwrap();
        assert_eq!(response.updated_fields, 2);

        let user_service = state.read().await.user_service.clone();
        let user = user_service.get_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.age_range.as_deref(), Some("25-34"));
        assert_eq!(user.news_frequency.as_deref(), Some("daily"));
    }

    #[tokio::test]
    async fn test_update_profile_handler_empty_body() {
        let state = test_state(false).await;
        let authed = seeded_user(&state).await;

        let Json(response) = handlers::profile::update_profile_handler(
            Extension(state),
            authed,
            Json(ProfileUpdate::default()),
        )
        .await
        .unwrap();
        assert_eq!(response.updated_fields, 0);
        assert_eq!(response.message, "No fields to update");
    }

    #[tokio::test]
    async fn test_update_profile_handler_rejects_invalid_input() {
        let state = test_state(false).await;
        let authed = seeded_user(&state).await;

        let update = ProfileUpdate {
            credibility_threshold: Some(-0.1),
            ..Default::default()
        };
        let err = handlers::profile::update_profile_handler(Extension(state), authed, Json(update))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}

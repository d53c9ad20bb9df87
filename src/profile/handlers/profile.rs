// src/profile/handlers/profile.rs

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, Validator};
use crate::profile::models::{ProfileUpdate, ProfileUpdateResponse};
use crate::profile::validators::ProfileUpdateValidator;

/// PUT /auth/profile - Update user profile
pub async fn update_profile_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<ProfileUpdate>,
) -> Result<Json<ProfileUpdateResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    info!(user_id = authed.id, "Profile update request received");

    ProfileUpdateValidator.validate(&request).into_result()?;

    let updated_fields = state
        .user_service
        .update_profile(authed.id, &request)
        .await?;

    let message = if updated_fields == 0 {
        "No fields to update"
    } else {
        "Profile updated successfully"
    };

    Ok(Json(ProfileUpdateResponse {
        message: message.to_string(),
        updated_fields,
    }))
}

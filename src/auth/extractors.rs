//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::tokens::{bearer_token, decode_token};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer JWT and loads the (active) user from the local store.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub remote_user_id: Option<i64>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the Extension containing the AppState
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let token = match bearer_token(&parts.headers) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        let claims = match decode_token(&app_state.jwt_secret, token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "JWT token validation failed");
                return Err(ApiError::Unauthorized("invalid token".into()));
            }
        };

        let user_id: i64 = claims.sub.parse().map_err(|_| {
            warn!(sub = %claims.sub, "JWT subject is not a user id");
            ApiError::Unauthorized("invalid token".into())
        })?;

        let user = app_state
            .user_service
            .get_user_by_id(user_id)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = user_id,
                    "Database error during user lookup in authentication"
                );
                ApiError::from(e)
            })?;

        match user {
            Some(u) => {
                debug!(
                    user_id = u.id,
                    email = %safe_email_log(&u.email),
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser {
                    id: u.id,
                    email: u.email,
                    name: u.name,
                    remote_user_id: u.remote_user_id,
                })
            }
            None => {
                warn!(user_id = user_id, "Authentication failed: user not found or inactive");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}

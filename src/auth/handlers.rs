//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::AuthedUser;
use super::models::{
    AuthResponse, GoogleIdTokenPayload, LoginRequest, NewUser, OAuthIdentity,
    PasswordVerification, RegisterRequest, User,
};
use super::tokens::issue_token;
use super::validators::{LoginValidator, RegisterValidator};
use crate::common::{safe_email_log, ApiError, AppState, Validator};

fn token_response(state: &AppState, user: &User) -> Result<Json<AuthResponse>, ApiError> {
    let access_token = issue_token(&state.jwt_secret, user, state.access_token_ttl_minutes)
        .map_err(|e| {
            error!(
                error = %e,
                user_id = user.id,
                "JWT encoding error during authentication"
            );
            ApiError::InternalServer("jwt error".to_string())
        })?;

    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer",
        user_id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    }))
}

/// POST /auth/register
/// Registers a new user with email and password
///
/// # Request Body
/// ```json
/// { "email": "a@b.com", "name": "A", "password": "Secret123" }
/// ```
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    RegisterValidator.validate(&payload).into_result()?;

    let email = payload.email.trim().to_string();
    info!(email = %safe_email_log(&email), "Received registration request");

    let user = state
        .user_service
        .create_user(NewUser {
            email,
            name: payload.name.trim().to_string(),
            password: Some(payload.password),
            oauth: None,
            picture_url: None,
        })
        .await?;

    info!(user_id = user.id, "User registered");
    token_response(&state, &user)
}

/// POST /auth/login
/// Logs in with email and password
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    if !LoginValidator.validate(&payload).is_valid {
        // Malformed credentials are indistinguishable from wrong ones
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user = state
        .user_service
        .verify_credentials(payload.email.trim(), &payload.password)
        .await?;

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        "User logged in"
    );
    token_response(&state, &user)
}

/// POST /auth/google
/// Authenticates a user via Google OAuth ID token
///
/// # Request Body
/// ```json
/// { "id_token": "<google id token>" }
/// ```
pub async fn google_auth(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<GoogleIdTokenPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    info!("🔐 Received Google auth request");
    let state = state_lock.read().await.clone();

    let identity = state
        .google_service
        .verify_id_token(&payload.id_token)
        .await?;

    debug!(
        email = %safe_email_log(&identity.email),
        provider = "google",
        "Google token validation successful, proceeding with user lookup"
    );

    let name = identity
        .name
        .clone()
        .unwrap_or_else(|| identity.email.split('@').next().unwrap_or_default().to_string());

    let user = state
        .user_service
        .find_or_create_oauth_user(NewUser {
            email: identity.email,
            name,
            password: None,
            oauth: Some(OAuthIdentity {
                provider: "google".to_string(),
                provider_id: identity.sub,
                access_token: None,
            }),
            picture_url: identity.picture,
        })
        .await?;

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        provider = "google",
        "User authentication successful via Google OAuth"
    );
    token_response(&state, &user)
}

/// GET /auth/me
/// Returns the current authenticated user's profile
#[axum::debug_handler]
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<User>, ApiError> {
    let state = state_lock.read().await.clone();

    match state.user_service.get_user_by_id(authed.id).await? {
        Some(user) => Ok(Json(user)),
        None => {
            warn!(user_id = authed.id, "Authenticated user disappeared");
            Err(ApiError::NotFound("User not found".to_string()))
        }
    }
}

/// POST /auth/verify-password
/// Onboarding gate: compares against the configured onboarding password
pub async fn verify_password_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<PasswordVerification>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    if payload.password == state.onboarding_password {
        Ok(Json(serde_json::json!({
            "valid": true,
            "message": "Password verified",
        })))
    } else {
        warn!("Onboarding password rejected");
        Err(ApiError::Unauthorized("Invalid password".to_string()))
    }
}

//! Authentication routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::rate_limit_middleware::rate_limit_middleware;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /auth/register` - Email/password registration (rate limited)
/// - `POST /auth/login` - Email/password login (rate limited)
/// - `POST /auth/google` - Google ID token sign-in
/// - `POST /auth/verify-password` - Onboarding password gate
/// - `GET /auth/me` - Get current user information
pub fn auth_routes() -> Router {
    let limited = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route_layer(middleware::from_fn(rate_limit_middleware));

    Router::new()
        .route("/auth/google", post(handlers::google_auth))
        .route("/auth/verify-password", post(handlers::verify_password_handler))
        .route("/auth/me", get(handlers::me_handler))
        .merge(limited)
}

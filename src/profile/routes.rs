// src/profile/routes.rs

use axum::{middleware, routing::put, Router};

use super::handlers::profile;
use crate::rate_limit_middleware::rate_limit_middleware;

pub fn profile_routes() -> Router {
    Router::new()
        .route("/auth/profile", put(profile::update_profile_handler))
        .route_layer(middleware::from_fn(rate_limit_middleware))
}

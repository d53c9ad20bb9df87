// src/recommendations/routes.rs

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::rate_limit_middleware::rate_limit_middleware;

pub fn recommendation_routes() -> Router {
    Router::new()
        .route("/recommendations", get(handlers::get_recommendations))
        .route("/interactions", post(handlers::record_interaction))
        .route("/stats", get(handlers::get_stats))
        .route_layer(middleware::from_fn(rate_limit_middleware))
}

// Application state shared across all modules

use std::sync::Arc;

use crate::db::Stores;
use crate::services::{GoogleService, RateLimitService, RecommendationService, UserService};

/// Application state containing the store handles, services, and auth configuration
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub onboarding_password: String,
    pub user_service: Arc<UserService>,
    pub recommendation_service: Arc<RecommendationService>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub google_service: Arc<GoogleService>,
}

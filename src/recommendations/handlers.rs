// src/recommendations/handlers.rs

use axum::extract::{Extension, Json, Query};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::{
    CreateInteractionRequest, InteractionResponse, RecommendationQuery, RecommendationRow,
    UserStats,
};
use super::validators::{InteractionValidator, RecommendationQueryValidator};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, Validator};

/// GET /recommendations?page=&limit=
/// Personalized feed for the current user; returned items are marked served
pub async fn get_recommendations(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Vec<RecommendationRow>>, ApiError> {
    let state = state_lock.read().await.clone();

    RecommendationQueryValidator.validate(&query).into_result()?;

    let rows = state
        .recommendation_service
        .get_recommendations(authed.id, authed.remote_user_id, &query)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = authed.id, "Error fetching recommendations");
            ApiError::from(e)
        })?;

    info!(
        user_id = authed.id,
        page = query.page,
        count = rows.len(),
        "Served recommendations"
    );
    Ok(Json(rows))
}

/// POST /interactions
pub async fn record_interaction(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateInteractionRequest>,
) -> Result<Json<InteractionResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    InteractionValidator.validate(&request).into_result()?;

    state
        .recommendation_service
        .record_interaction(authed.id, &request)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = authed.id,
                article_id = request.article_id,
                "Error recording interaction"
            );
            ApiError::from(e)
        })?;

    Ok(Json(InteractionResponse {
        status: "success",
        message: "Interaction recorded",
    }))
}

/// GET /stats
pub async fn get_stats(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<UserStats>, ApiError> {
    let state = state_lock.read().await.clone();

    let stats = state
        .recommendation_service
        .stats(authed.id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = authed.id, "Error fetching stats");
            ApiError::from(e)
        })?;

    Ok(Json(stats))
}

// src/recommendations/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Store Rows
// ============================================================================

/// Unserved local recommendation joined with its cached article
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecommendationRow {
    pub id: i64,
    pub article_id: i64,
    pub relevance_score: f64,
    pub recommendation_reason: Option<String>,
    pub article_title: Option<String>,
    pub article_source: Option<String>,
    pub article_url: Option<String>,
    pub article_description: Option<String>,
    pub created_at: String,
}

/// Remote recommendation joined with its source article
#[derive(Debug, Clone, FromRow)]
pub struct RemoteRecommendation {
    pub article_id: i64,
    pub relevance_score: f64,
    pub score_breakdown: Option<String>,
    pub recommendation_reason: Option<String>,
    pub algorithm_version: Option<String>,
    pub created_at: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct StatsRow {
    pub total_recommendations: i64,
    pub served_count: i64,
    pub clicked_count: i64,
    pub avg_relevance_score: Option<f64>,
    pub last_recommendation_at: Option<String>,
}

/// Outcome of one sync pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote rows whose article was cached and whose insert ran
    pub processed: usize,
    /// Rows actually added locally; re-syncing the same rows adds none
    pub inserted: u64,
}

// ============================================================================
// Request Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    View,
    Click,
    Like,
    Share,
    Hide,
    Bookmark,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Click => "click",
            InteractionType::Like => "like",
            InteractionType::Share => "share",
            InteractionType::Hide => "hide",
            InteractionType::Bookmark => "bookmark",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInteractionRequest {
    pub article_id: i64,
    pub interaction_type: InteractionType,
    pub time_spent_seconds: Option<i64>,
    pub completion_rate: Option<f64>,
    pub scroll_depth: Option<f64>,
    pub position_in_feed: Option<i64>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl RecommendationQuery {
    /// Row offset for the requested page, saturating instead of overflowing
    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .max(0)
            .saturating_mul(self.limit.max(0))
    }
}

// ============================================================================
// Response Models
// ============================================================================

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct UserStats {
    pub total_recommendations: i64,
    pub served_count: i64,
    pub clicked_count: i64,
    pub avg_relevance_score: f64,
    pub last_recommendation_at: Option<String>,
    pub click_through_rate: f64,
}

impl From<Option<StatsRow>> for UserStats {
    fn from(row: Option<StatsRow>) -> Self {
        match row {
            Some(row) => {
                let click_through_rate = if row.served_count > 0 {
                    let ratio = row.clicked_count as f64 / row.served_count as f64 * 100.0;
                    (ratio * 100.0).round() / 100.0
                } else {
                    0.0
                };
                Self {
                    total_recommendations: row.total_recommendations,
                    served_count: row.served_count,
                    clicked_count: row.clicked_count,
                    avg_relevance_score: row.avg_relevance_score.unwrap_or(0.0),
                    last_recommendation_at: row.last_recommendation_at,
                    click_through_rate,
                }
            }
            None => Self {
                total_recommendations: 0,
                served_count: 0,
                clicked_count: 0,
                avg_relevance_score: 0.0,
                last_recommendation_at: None,
                click_through_rate: 0.0,
            },
        }
    }
}

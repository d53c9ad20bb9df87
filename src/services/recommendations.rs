// src/services/recommendations.rs
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::common::config::SyncConfig;
use crate::common::helpers::sql_timestamp;
use crate::db::executor::placeholders;
use crate::db::{DbError, QueryExecutor, SqlParam, StoreTarget};
use crate::params;
use crate::recommendations::models::{
    CreateInteractionRequest, InteractionType, RecommendationQuery, RecommendationRow,
    RemoteRecommendation, StatsRow, SyncReport, UserStats,
};

/// Local recommendation feed, filled lazily from the remote store.
#[derive(Debug, Clone)]
pub struct RecommendationService {
    executor: QueryExecutor,
    sync: SyncConfig,
}

impl RecommendationService {
    pub fn new(executor: QueryExecutor, sync: SyncConfig) -> Self {
        info!(
            window_days = sync.window_days,
            page_size = sync.page_size,
            cache_ttl_hours = sync.cache_ttl_hours,
            "Initializing RecommendationService"
        );
        Self { executor, sync }
    }

    /// Unserved recommendations, syncing from the remote store when none are
    /// queued locally. Everything returned is marked served.
    pub async fn get_recommendations(
        &self,
        user_id: i64,
        remote_user_id: Option<i64>,
        query: &RecommendationQuery,
    ) -> Result<Vec<RecommendationRow>, DbError> {
        let mut rows = self
            .list_unserved(user_id, query.limit, query.offset())
            .await?;

        if rows.is_empty() {
            let report = self.sync_from_remote(user_id, remote_user_id).await;
            debug!(
                user_id = user_id,
                processed = report.processed,
                inserted = report.inserted,
                "Lazy sync finished"
            );
            rows = self
                .list_unserved(user_id, query.limit, query.offset())
                .await?;
        }

        if !rows.is_empty() {
            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            self.mark_served(&ids).await?;
        }

        Ok(rows)
    }

    pub async fn list_unserved(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecommendationRow>, DbError> {
        self.executor
            .fetch_all(
                StoreTarget::Local,
                r#"
                SELECT
                    r.id,
                    r.article_id,
                    r.relevance_score,
                    r.recommendation_reason,
                    a.title AS article_title,
                    a.source AS article_source,
                    a.url AS article_url,
                    a.description AS article_description,
                    r.created_at
                FROM user_recommendations r
                LEFT JOIN article_cache a ON r.article_id = a.article_id
                WHERE r.user_id = ? AND r.served = 0
                ORDER BY r.relevance_score DESC, r.created_at DESC
                LIMIT ? OFFSET ?
                "#,
                &params![user_id, limit, offset],
            )
            .await
    }

    pub async fn mark_served(&self, ids: &[i64]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE user_recommendations SET served = 1, served_at = ? WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut values = params![sql_timestamp(Utc::now())];
        values.extend(ids.iter().map(|&id| SqlParam::from(id)));

        self.executor
            .execute(StoreTarget::Local, &sql, &values)
            .await
    }

    pub async fn sync_from_remote(&self, user_id: i64, remote_user_id: Option<i64>) -> SyncReport {
        self.sync_from_remote_at(user_id, remote_user_id, Utc::now())
            .await
    }

    /// Copy recent remote recommendations (and their articles) into the local
    /// store. Never fails: an unavailable remote yields an empty report, and a
    /// row that cannot be written is logged and skipped.
    pub async fn sync_from_remote_at(
        &self,
        user_id: i64,
        remote_user_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let remote_id = remote_user_id.unwrap_or(user_id);
        let since = sql_timestamp(now - Duration::days(self.sync.window_days));

        let remote_rows: Vec<RemoteRecommendation> = match self
            .executor
            .fetch_all(
                StoreTarget::Remote,
                r#"
                SELECT
                    r.article_id,
                    r.relevance_score,
                    r.score_breakdown,
                    r.recommendation_reason,
                    r.algorithm_version,
                    r.created_at,
                    a.title,
                    a.source,
                    a.url,
                    a.published_at,
                    a.description
                FROM user_recommendations r
                JOIN news_articles a ON r.article_id = a.id
                WHERE r.user_id = ? AND r.created_at > ?
                ORDER BY r.relevance_score DESC
                LIMIT ?
                "#,
                &params![remote_id, since, self.sync.page_size],
            )
            .await
        {
            Ok(rows) => rows,
            Err(DbError::StoreUnavailable(_)) => {
                debug!(user_id = user_id, "Remote store unavailable, skipping sync");
                return SyncReport::default();
            }
            Err(e) => {
                warn!(error = %e, user_id = user_id, "Failed to fetch remote recommendations");
                return SyncReport::default();
            }
        };

        let mut report = SyncReport::default();
        let expires_at = sql_timestamp(now + Duration::hours(self.sync.cache_ttl_hours));
        let cached_at = sql_timestamp(now);

        for rec in &remote_rows {
            if let Err(e) = self.cache_article(rec, &cached_at, &expires_at).await {
                warn!(
                    error = %e,
                    user_id = user_id,
                    article_id = rec.article_id,
                    "Failed to cache article, skipping recommendation"
                );
                continue;
            }

            match self.insert_recommendation(user_id, rec).await {
                Ok(inserted) => {
                    report.processed += 1;
                    report.inserted += inserted;
                }
                Err(e) => warn!(
                    error = %e,
                    user_id = user_id,
                    article_id = rec.article_id,
                    "Failed to store synced recommendation"
                ),
            }
        }

        info!(
            user_id = user_id,
            fetched = remote_rows.len(),
            processed = report.processed,
            inserted = report.inserted,
            "Synced recommendations from remote store"
        );
        report
    }

    async fn cache_article(
        &self,
        rec: &RemoteRecommendation,
        cached_at: &str,
        expires_at: &str,
    ) -> Result<u64, DbError> {
        self.executor
            .execute(
                StoreTarget::Local,
                r#"
                INSERT INTO article_cache (
                    article_id, title, source, url, published_at, description, cached_at, expires_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (article_id) DO UPDATE SET
                    title = excluded.title,
                    source = excluded.source,
                    url = excluded.url,
                    published_at = excluded.published_at,
                    description = excluded.description,
                    cached_at = excluded.cached_at,
                    expires_at = excluded.expires_at
                "#,
                &params![
                    rec.article_id,
                    rec.title.clone(),
                    rec.source.clone(),
                    rec.url.clone(),
                    rec.published_at.clone(),
                    rec.description.clone(),
                    cached_at,
                    expires_at
                ],
            )
            .await
    }

    /// Keeps the remote `created_at`, so the (user, article, created_at) key
    /// makes repeated syncs of the same row a no-op.
    async fn insert_recommendation(
        &self,
        user_id: i64,
        rec: &RemoteRecommendation,
    ) -> Result<u64, DbError> {
        self.executor
            .execute(
                StoreTarget::Local,
                r#"
                INSERT INTO user_recommendations (
                    user_id, article_id, relevance_score, score_breakdown,
                    recommendation_reason, algorithm_version, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (user_id, article_id, created_at) DO NOTHING
                "#,
                &params![
                    user_id,
                    rec.article_id,
                    rec.relevance_score,
                    rec.score_breakdown.clone(),
                    rec.recommendation_reason.clone(),
                    rec.algorithm_version.clone(),
                    &rec.created_at
                ],
            )
            .await
    }

    /// Store an interaction; a click also flags the matching recommendation
    pub async fn record_interaction(
        &self,
        user_id: i64,
        interaction: &CreateInteractionRequest,
    ) -> Result<(), DbError> {
        let now = sql_timestamp(Utc::now());

        self.executor
            .execute(
                StoreTarget::Local,
                r#"
                INSERT INTO user_interactions (
                    user_id, article_id, interaction_type, time_spent_seconds,
                    completion_rate, scroll_depth, position_in_feed, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                &params![
                    user_id,
                    interaction.article_id,
                    interaction.interaction_type.as_str(),
                    interaction.time_spent_seconds.unwrap_or(0),
                    interaction.completion_rate,
                    interaction.scroll_depth,
                    interaction.position_in_feed,
                    now.clone()
                ],
            )
            .await?;

        if interaction.interaction_type == InteractionType::Click {
            let flagged = self
                .executor
                .execute(
                    StoreTarget::Local,
                    r#"
                    UPDATE user_recommendations
                    SET clicked = 1, clicked_at = ?
                    WHERE user_id = ? AND article_id = ?
                    "#,
                    &params![now, user_id, interaction.article_id],
                )
                .await?;
            debug!(
                user_id = user_id,
                article_id = interaction.article_id,
                recommendations = flagged,
                "Recorded click"
            );
        }

        Ok(())
    }

    pub async fn stats(&self, user_id: i64) -> Result<UserStats, DbError> {
        let row: Option<StatsRow> = self
            .executor
            .fetch_optional(
                StoreTarget::Local,
                r#"
                SELECT
                    total_recommendations,
                    served_count,
                    clicked_count,
                    avg_relevance_score,
                    last_recommendation_at
                FROM recommendation_stats
                WHERE user_id = ?
                "#,
                &params![user_id],
            )
            .await?;

        Ok(UserStats::from(row))
    }
}

// src/services/rate_limit.rs
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use std::env;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::common::config::parse_or;
use crate::common::helpers::{minute_bucket, parse_sql_timestamp, sql_timestamp};
use crate::db::{DbError, QueryExecutor, StoreTarget};
use crate::params;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_minute: u32,
    pub per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: 60, // 60 requests per identifier per endpoint per minute
            per_hour: 1000, // 1000 requests per identifier per endpoint per hour
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // RATE_LIMIT_ENABLED - set to "false" to disable rate limiting
        if let Ok(enabled) = env::var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        config.per_minute = parse_or("RATE_LIMIT_PER_MINUTE", config.per_minute);
        config.per_hour = parse_or("RATE_LIMIT_PER_HOUR", config.per_hour);

        config
    }
}

/// Lookback horizon a limit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Minute,
    Hour,
}

impl RateWindow {
    pub fn span(&self) -> Duration {
        match self {
            RateWindow::Minute => Duration::minutes(1),
            RateWindow::Hour => Duration::hours(1),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RateWindow::Minute => "minute",
            RateWindow::Hour => "hour",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { window: RateWindow, retry_after: u64 },
}

#[derive(Debug, FromRow)]
struct WindowUsage {
    total: i64,
    oldest: Option<String>,
}

/// Persisted sliding-window limiter keyed by (identifier, endpoint, minute).
///
/// Counter reads that fail let the request through; counter writes that fail
/// are logged and ignored.
#[derive(Debug)]
pub struct RateLimitService {
    executor: QueryExecutor,
    config: RateLimitConfig,
}

impl RateLimitService {
    pub fn new(executor: QueryExecutor, config: RateLimitConfig) -> Self {
        info!(
            enabled = config.enabled,
            per_minute = config.per_minute,
            per_hour = config.per_hour,
            "Initializing RateLimitService"
        );
        Self { executor, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check both windows for `identifier` on `endpoint` and record the request if allowed
    pub async fn check_and_record(&self, identifier: &str, endpoint: &str) -> RateLimitResult {
        self.check_and_record_at(identifier, endpoint, Utc::now()).await
    }

    pub async fn check_and_record_at(
        &self,
        identifier: &str,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        let windows = [
            (RateWindow::Minute, self.config.per_minute),
            (RateWindow::Hour, self.config.per_hour),
        ];

        for (window, limit) in windows {
            match self.window_usage(identifier, endpoint, window, now).await {
                Ok(usage) if usage.total >= i64::from(limit) => {
                    let retry_after = retry_after_secs(usage.oldest.as_deref(), window, now);
                    return RateLimitResult::Limited {
                        window,
                        retry_after,
                    };
                }
                Ok(usage) => {
                    debug!(
                        identifier = %identifier,
                        endpoint = %endpoint,
                        window = window.label(),
                        total = usage.total,
                        limit = limit,
                        "Within rate limit"
                    );
                }
                Err(e) => {
                    error!(
                        error = %e,
                        identifier = %identifier,
                        endpoint = %endpoint,
                        window = window.label(),
                        "Error checking rate limit, allowing request"
                    );
                }
            }
        }

        self.record_at(identifier, endpoint, now).await;
        RateLimitResult::Allowed
    }

    async fn window_usage(
        &self,
        identifier: &str,
        endpoint: &str,
        window: RateWindow,
        now: DateTime<Utc>,
    ) -> Result<WindowUsage, DbError> {
        let since = sql_timestamp(now - window.span());

        let usage = self
            .executor
            .fetch_optional::<WindowUsage>(
                StoreTarget::Local,
                r#"
                SELECT COALESCE(SUM(request_count), 0) AS total, MIN(window_start) AS oldest
                FROM rate_limits
                WHERE identifier = ? AND endpoint = ? AND window_start >= ?
                "#,
                &params![identifier, endpoint, since],
            )
            .await?;

        Ok(usage.unwrap_or(WindowUsage {
            total: 0,
            oldest: None,
        }))
    }

    /// Increment the counter for the minute containing `now`
    pub async fn record_at(&self, identifier: &str, endpoint: &str, now: DateTime<Utc>) {
        let bucket = sql_timestamp(minute_bucket(now));

        if let Err(e) = self
            .executor
            .execute(
                StoreTarget::Local,
                r#"
                INSERT INTO rate_limits (identifier, endpoint, window_start, request_count)
                VALUES (?, ?, ?, 1)
                ON CONFLICT (identifier, endpoint, window_start)
                DO UPDATE SET request_count = rate_limits.request_count + 1
                "#,
                &params![identifier, endpoint, bucket],
            )
            .await
        {
            error!(
                error = %e,
                identifier = %identifier,
                endpoint = %endpoint,
                "Error recording request for rate limiting"
            );
        }
    }

    /// Log a rate limit violation
    pub fn log_violation(&self, identifier: &str, endpoint: &str, result: &RateLimitResult) {
        if let RateLimitResult::Limited {
            window,
            retry_after,
        } = result
        {
            warn!(
                identifier = %identifier,
                endpoint = %endpoint,
                window = window.label(),
                retry_after = retry_after,
                "Rate limit violation detected"
            );
        }
    }

    /// Delete counters older than the longest window
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let cutoff = sql_timestamp(now - RateWindow::Hour.span());
        self.executor
            .execute(
                StoreTarget::Local,
                "DELETE FROM rate_limits WHERE window_start < ?",
                &params![cutoff],
            )
            .await
    }

    /// Periodically purge expired counters for the lifetime of the process
    pub fn start_purge_task(self: Arc<Self>, every: std::time::Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(std::time::Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                match self.purge_expired_at(Utc::now()).await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed = removed, "Purged expired rate limit counters"),
                    Err(e) => warn!(error = %e, "Failed to purge expired rate limit counters"),
                }
            }
        });
    }
}

/// Seconds until the oldest counted bucket leaves the window, at least 1
fn retry_after_secs(oldest: Option<&str>, window: RateWindow, now: DateTime<Utc>) -> u64 {
    let full = window.span().num_seconds().max(1) as u64;
    oldest
        .and_then(parse_sql_timestamp)
        .map(|start| (start + window.span() - now).num_seconds())
        .map(|secs| secs.max(1) as u64)
        .unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::test_executor;
    use chrono::TimeZone;

    async fn create_test_service(per_minute: u32, per_hour: u32) -> RateLimitService {
        let executor = test_executor(false).await;
        RateLimitService::new(
            executor,
            RateLimitConfig {
                enabled: true,
                per_minute,
                per_hour,
            },
        )
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limit_allows_within_limit() {
        let service = create_test_service(3, 100).await;

        let result = service
            .check_and_record_at("user_1", "/recommendations", at(12, 0, 0))
            .await;
        assert_eq!(result, RateLimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_fourth_request_in_minute_is_rejected_then_window_rolls_over() {
        let service = create_test_service(3, 100).await;

        for s in [10, 20, 30] {
            let result = service
                .check_and_record_at("ip_10.0.0.1", "/auth/login", at(12, 0, s))
                .await;
            assert_eq!(result, RateLimitResult::Allowed);
        }

        let blocked = service
            .check_and_record_at("ip_10.0.0.1", "/auth/login", at(12, 0, 50))
            .await;
        assert_eq!(
            blocked,
            RateLimitResult::Limited {
                window: RateWindow::Minute,
                retry_after: 10,
            }
        );

        let later = service
            .check_and_record_at("ip_10.0.0.1", "/auth/login", at(12, 1, 5))
            .await;
        assert_eq!(later, RateLimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_sixty_first_call_rejected() {
        let service = create_test_service(60, 1000).await;

        for _ in 0..60 {
            let result = service
                .check_and_record_at("user_42", "/recommendations", at(9, 30, 15))
                .await;
            assert_eq!(result, RateLimitResult::Allowed);
        }

        let result = service
            .check_and_record_at("user_42", "/recommendations", at(9, 30, 40))
            .await;
        assert!(matches!(
            result,
            RateLimitResult::Limited {
                window: RateWindow::Minute,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_hour_window_sums_minute_buckets() {
        let service = create_test_service(100, 5).await;

        for m in 0..5 {
            let result = service
                .check_and_record_at("user_7", "/stats", at(8, m * 10, 0))
                .await;
            assert_eq!(result, RateLimitResult::Allowed);
        }

        let blocked = service
            .check_and_record_at("user_7", "/stats", at(8, 45, 0))
            .await;
        assert_eq!(
            blocked,
            RateLimitResult::Limited {
                window: RateWindow::Hour,
                retry_after: 15 * 60,
            }
        );
    }

    #[tokio::test]
    async fn test_different_identifiers_and_endpoints_are_independent() {
        let service = create_test_service(1, 100).await;
        let now = at(10, 0, 0);

        assert_eq!(
            service.check_and_record_at("user_1", "/stats", now).await,
            RateLimitResult::Allowed
        );
        assert_eq!(
            service.check_and_record_at("user_2", "/stats", now).await,
            RateLimitResult::Allowed
        );
        assert_eq!(
            service
                .check_and_record_at("user_1", "/recommendations", now)
                .await,
            RateLimitResult::Allowed
        );
        assert!(matches!(
            service.check_and_record_at("user_1", "/stats", now).await,
            RateLimitResult::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_identifier_with_quotes_is_plain_data() {
        let service = create_test_service(1, 100).await;
        let hostile = "ip_1.2.3.4'; DELETE FROM rate_limits; --";
        let now = at(10, 0, 0);

        assert_eq!(
            service.check_and_record_at(hostile, "/stats", now).await,
            RateLimitResult::Allowed
        );
        assert!(matches!(
            service.check_and_record_at(hostile, "/stats", now).await,
            RateLimitResult::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_fails_open_when_counter_store_errors() {
        let service = create_test_service(1, 1).await;
        service.executor.stores().local().close().await;

        for _ in 0..3 {
            let result = service
                .check_and_record_at("user_1", "/recommendations", at(12, 0, 0))
                .await;
            assert_eq!(result, RateLimitResult::Allowed);
        }
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let executor = test_executor(false).await;
        let service = RateLimitService::new(
            executor,
            RateLimitConfig {
                enabled: false,
                per_minute: 0,
                per_hour: 0,
            },
        );

        let result = service
            .check_and_record_at("user_1", "/stats", at(12, 0, 0))
            .await;
        assert_eq!(result, RateLimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired_counters() {
        let service = create_test_service(100, 100).await;

        service.record_at("user_1", "/stats", at(6, 0, 0)).await;
        service.record_at("user_1", "/stats", at(7, 30, 0)).await;

        let removed = service.purge_expired_at(at(8, 0, 0)).await.unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_purge_task_survives_zero_interval() {
        let service = Arc::new(create_test_service(100, 100).await);
        service.record_at("user_1", "/stats", at(6, 0, 0)).await;

        service.clone().start_purge_task(std::time::Duration::ZERO);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        // The first tick fires immediately and already cleared the stale bucket
        let removed = service.purge_expired_at(at(8, 0, 0)).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_retry_after_without_oldest_uses_full_window() {
        assert_eq!(retry_after_secs(None, RateWindow::Minute, at(1, 0, 0)), 60);
        assert_eq!(
            retry_after_secs(Some("2024-05-01 00:59:30"), RateWindow::Minute, at(1, 0, 0)),
            30
        );
    }
}

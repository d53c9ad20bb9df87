// src/common/migrations.rs
//! Database schema management for the local and remote stores

use sqlx::SqlitePool;
use tracing::{info, warn};

/// Create the local store schema. `reset` drops existing tables first.
pub async fn run_local_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("RESET_DB=true - dropping local tables and recreating schema");
        drop_local_tables(pool).await?;
    }

    create_user_tables(pool).await?;
    create_recommendation_tables(pool).await?;
    create_rate_limit_tables(pool).await?;
    create_local_indexes(pool).await?;

    info!("Local database migration completed");
    Ok(())
}

/// Create the origin tables on the remote store.
///
/// Production remotes are provisioned elsewhere; this exists for development
/// (`REMOTE_BOOTSTRAP_SCHEMA=true`) and tests.
pub async fn run_remote_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users_personalized (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            password_hash TEXT,
            age_range TEXT,
            education_level TEXT,
            primary_interests TEXT,
            secondary_interests TEXT,
            political_orientation TEXT,
            credibility_threshold REAL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS news_articles (
            id INTEGER PRIMARY KEY,
            title TEXT,
            source TEXT,
            url TEXT,
            published_at TEXT,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_recommendations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            article_id INTEGER NOT NULL REFERENCES news_articles(id),
            relevance_score REAL NOT NULL,
            score_breakdown TEXT,
            recommendation_reason TEXT,
            algorithm_version TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_remote_recs_user_created ON user_recommendations(user_id, created_at)",
    )
    .execute(pool)
    .await?;

    info!("Remote database schema ensured");
    Ok(())
}

async fn drop_local_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DROP VIEW IF EXISTS recommendation_stats")
        .execute(pool)
        .await?;

    let tables = [
        "rate_limits",
        "user_interactions",
        "user_recommendations",
        "article_cache",
        "users",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT,
            oauth_provider TEXT,
            oauth_provider_id TEXT,
            oauth_access_token TEXT,
            picture_url TEXT,
            email_verified INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            remote_user_id INTEGER,
            age_range TEXT,
            education_level TEXT,
            field_of_study TEXT,
            primary_interests TEXT,
            secondary_interests TEXT,
            hobbies TEXT,
            topics_to_avoid TEXT,
            preferred_complexity TEXT,
            preferred_article_length TEXT,
            news_frequency TEXT,
            preferred_content_types TEXT,
            political_orientation TEXT,
            credibility_threshold REAL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT,
            last_login_at TEXT,
            last_synced_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recommendation_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_cache (
            article_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            source TEXT,
            url TEXT,
            published_at TEXT,
            description TEXT,
            cached_at TEXT NOT NULL DEFAULT (datetime('now')),
            expires_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness includes created_at; see DESIGN.md on the dedup key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_recommendations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            article_id INTEGER NOT NULL,
            relevance_score REAL NOT NULL,
            score_breakdown TEXT,
            recommendation_reason TEXT,
            algorithm_version TEXT,
            served INTEGER NOT NULL DEFAULT 0,
            served_at TEXT,
            clicked INTEGER NOT NULL DEFAULT 0,
            clicked_at TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, article_id, created_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            article_id INTEGER NOT NULL,
            interaction_type TEXT NOT NULL
                CHECK (interaction_type IN ('view', 'click', 'like', 'share', 'hide', 'bookmark')),
            time_spent_seconds INTEGER,
            completion_rate REAL,
            scroll_depth REAL,
            position_in_feed INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE VIEW IF NOT EXISTS recommendation_stats AS
        SELECT
            user_id,
            COUNT(*) AS total_recommendations,
            COALESCE(SUM(served), 0) AS served_count,
            COALESCE(SUM(clicked), 0) AS clicked_count,
            AVG(relevance_score) AS avg_relevance_score,
            MAX(created_at) AS last_recommendation_at
        FROM user_recommendations
        GROUP BY user_id
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rate_limit_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rate_limits (
            identifier TEXT NOT NULL,
            endpoint TEXT NOT NULL,
            window_start TEXT NOT NULL,
            request_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (identifier, endpoint, window_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_local_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_users_oauth ON users(oauth_provider, oauth_provider_id)",
        "CREATE INDEX IF NOT EXISTS idx_recs_user_served ON user_recommendations(user_id, served)",
        "CREATE INDEX IF NOT EXISTS idx_recs_user_article ON user_recommendations(user_id, article_id)",
        "CREATE INDEX IF NOT EXISTS idx_interactions_user ON user_interactions(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_rate_limits_window ON rate_limits(window_start)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

// src/services/users.rs
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::models::{NewUser, User, USER_COLUMNS};
use crate::auth::password::{hash_password, verify_password};
use crate::common::helpers::sql_timestamp;
use crate::common::safe_email_log;
use crate::db::{DbError, QueryExecutor, SqlParam, StoreTarget};
use crate::params;
use crate::profile::models::{ProfileField, ProfileUpdate};

/// Provider whose identities arrive with an already-verified email
const TRUSTED_OAUTH_PROVIDER: &str = "google";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user with this email already exists")]
    DuplicateEmail,

    #[error("email already registered with a different login method")]
    EmailRegisteredWithOtherMethod,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Local user directory with best-effort mirroring to the remote store.
///
/// The local store is authoritative. Remote writes never fail a local
/// operation; they are logged and skipped.
#[derive(Debug, Clone)]
pub struct UserService {
    executor: QueryExecutor,
}

impl UserService {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = ? AND is_active = 1",
            USER_COLUMNS
        );
        Ok(self
            .executor
            .fetch_optional(StoreTarget::Local, &sql, &params![email])
            .await?)
    }

    pub async fn get_user_by_oauth(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {} FROM users WHERE oauth_provider = ? AND oauth_provider_id = ? AND is_active = 1",
            USER_COLUMNS
        );
        Ok(self
            .executor
            .fetch_optional(StoreTarget::Local, &sql, &params![provider, provider_id])
            .await?)
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = ? AND is_active = 1",
            USER_COLUMNS
        );
        Ok(self
            .executor
            .fetch_optional(StoreTarget::Local, &sql, &params![user_id])
            .await?)
    }

    /// Create a local account and mirror it to the remote store when possible
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, UserError> {
        if self.get_user_by_email(&new_user.email).await?.is_some() {
            warn!(
                email = %safe_email_log(&new_user.email),
                "User creation rejected: email already registered"
            );
            return Err(UserError::DuplicateEmail);
        }

        let password_hash = match new_user.password.clone() {
            Some(password) => Some(hash_in_background(password).await?),
            None => None,
        };

        let (provider, provider_id, access_token) = match &new_user.oauth {
            Some(identity) => (
                Some(identity.provider.clone()),
                Some(identity.provider_id.clone()),
                identity.access_token.clone(),
            ),
            None => (None, None, None),
        };
        let email_verified = provider.as_deref() == Some(TRUSTED_OAUTH_PROVIDER);
        let now = sql_timestamp(Utc::now());

        let inserted: Option<(i64,)> = self
            .executor
            .fetch_optional(
                StoreTarget::Local,
                r#"
                INSERT INTO users (
                    email, name, password_hash, oauth_provider, oauth_provider_id,
                    oauth_access_token, picture_url, email_verified, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
                &params![
                    &new_user.email,
                    &new_user.name,
                    password_hash.clone(),
                    provider.clone(),
                    provider_id,
                    access_token,
                    new_user.picture_url.clone(),
                    email_verified,
                    now.clone(),
                    now
                ],
            )
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    UserError::DuplicateEmail
                } else {
                    UserError::Database(e)
                }
            })?;

        let user_id = inserted
            .map(|(id,)| id)
            .ok_or(UserError::Database(DbError::OperationFailed(
                sqlx::Error::RowNotFound,
            )))?;

        info!(
            user_id = user_id,
            email = %safe_email_log(&new_user.email),
            provider = provider.as_deref().unwrap_or("password"),
            "Created local user"
        );

        if let Some(remote_id) = self
            .mirror_new_user(&new_user.email, &new_user.name, password_hash.as_deref())
            .await
        {
            self.record_remote_id(user_id, remote_id).await;
        }

        self.get_user_by_id(user_id).await?.ok_or(UserError::NotFound)
    }

    /// Resolve an external identity to an account, creating one on first sign-in.
    ///
    /// An email already owned by an account with a different login method is
    /// rejected rather than linked.
    pub async fn find_or_create_oauth_user(&self, new_user: NewUser) -> Result<User, UserError> {
        let identity = new_user.oauth.clone().ok_or(UserError::InvalidCredentials)?;

        if let Some(user) = self
            .get_user_by_oauth(&identity.provider, &identity.provider_id)
            .await?
        {
            debug!(
                user_id = user.id,
                provider = %identity.provider,
                "Found existing OAuth user"
            );
            return Ok(user);
        }

        if self.get_user_by_email(&new_user.email).await?.is_some() {
            warn!(
                email = %safe_email_log(&new_user.email),
                provider = %identity.provider,
                "OAuth sign-in rejected: email registered with a different method"
            );
            return Err(UserError::EmailRegisteredWithOtherMethod);
        }

        self.create_user(new_user).await
    }

    /// Check an email/password pair and stamp the login time
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, UserError> {
        let mut user = match self.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                debug!(email = %safe_email_log(email), "Login failed: unknown email");
                return Err(UserError::InvalidCredentials);
            }
        };

        let stored_hash = match user.password_hash.clone() {
            Some(hash) => hash,
            None => {
                debug!(user_id = user.id, "Login failed: account has no password");
                return Err(UserError::InvalidCredentials);
            }
        };

        let candidate = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored_hash))
            .await
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;

        if !matches {
            debug!(user_id = user.id, "Login failed: password mismatch");
            return Err(UserError::InvalidCredentials);
        }

        let now = sql_timestamp(Utc::now());
        self.executor
            .execute(
                StoreTarget::Local,
                "UPDATE users SET last_login_at = ? WHERE id = ?",
                &params![now.clone(), user.id],
            )
            .await?;
        user.last_login_at = Some(now);

        info!(user_id = user.id, "User credentials verified");
        Ok(user)
    }

    /// Apply the supplied profile fields locally, then mirror the remote subset.
    /// Returns the number of fields written.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<usize, UserError> {
        let changes = update.changes();
        if changes.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = changes
            .iter()
            .map(|(field, _)| format!("{} = ?", field.column()))
            .collect();
        let sql = format!(
            "UPDATE users SET {}, updated_at = ? WHERE id = ? AND is_active = 1",
            assignments.join(", ")
        );

        let mut values: Vec<SqlParam> = changes.iter().map(|(_, value)| value.clone()).collect();
        values.push(SqlParam::from(sql_timestamp(Utc::now())));
        values.push(SqlParam::from(user_id));

        let updated = self
            .executor
            .execute(StoreTarget::Local, &sql, &values)
            .await?;
        if updated == 0 {
            return Err(UserError::NotFound);
        }

        info!(
            user_id = user_id,
            fields = changes.len(),
            "Updated user profile"
        );

        self.mirror_profile(user_id, &changes).await;
        Ok(changes.len())
    }

    async fn mirror_new_user(
        &self,
        email: &str,
        name: &str,
        password_hash: Option<&str>,
    ) -> Option<i64> {
        let result: Result<Option<(i64,)>, DbError> = self
            .executor
            .fetch_optional(
                StoreTarget::Remote,
                r#"
                INSERT INTO users_personalized (email, name, password_hash, created_at)
                VALUES (?, ?, ?, ?)
                RETURNING id
                "#,
                &params![email, name, password_hash, sql_timestamp(Utc::now())],
            )
            .await;

        match result {
            Ok(Some((remote_id,))) => {
                info!(
                    remote_user_id = remote_id,
                    email = %safe_email_log(email),
                    "Mirrored user to remote store"
                );
                Some(remote_id)
            }
            Ok(None) => None,
            Err(DbError::StoreUnavailable(_)) => {
                debug!(
                    email = %safe_email_log(email),
                    "Remote store unavailable, user kept local only"
                );
                None
            }
            Err(e) => {
                warn!(
                    error = %e,
                    email = %safe_email_log(email),
                    "Failed to mirror user to remote store"
                );
                None
            }
        }
    }

    async fn record_remote_id(&self, user_id: i64, remote_id: i64) {
        if let Err(e) = self
            .executor
            .execute(
                StoreTarget::Local,
                "UPDATE users SET remote_user_id = ?, last_synced_at = ? WHERE id = ?",
                &params![remote_id, sql_timestamp(Utc::now()), user_id],
            )
            .await
        {
            warn!(
                error = %e,
                user_id = user_id,
                remote_user_id = remote_id,
                "Failed to record remote user id"
            );
        }
    }

    async fn mirror_profile(&self, user_id: i64, changes: &[(ProfileField, SqlParam)]) {
        let mirrored: Vec<&(ProfileField, SqlParam)> = changes
            .iter()
            .filter(|(field, _)| field.mirrors_to_remote())
            .collect();
        if mirrored.is_empty() {
            return;
        }

        let remote_id = match self
            .executor
            .fetch_optional::<(Option<i64>,)>(
                StoreTarget::Local,
                "SELECT remote_user_id FROM users WHERE id = ?",
                &params![user_id],
            )
            .await
        {
            Ok(Some((Some(remote_id),))) => remote_id,
            Ok(_) => {
                debug!(user_id = user_id, "No remote user id, skipping profile mirror");
                return;
            }
            Err(e) => {
                warn!(error = %e, user_id = user_id, "Failed to look up remote user id");
                return;
            }
        };

        let assignments: Vec<String> = mirrored
            .iter()
            .map(|(field, _)| format!("{} = ?", field.column()))
            .collect();
        let sql = format!(
            "UPDATE users_personalized SET {} WHERE id = ?",
            assignments.join(", ")
        );
        let mut values: Vec<SqlParam> = mirrored.iter().map(|(_, value)| value.clone()).collect();
        values.push(SqlParam::from(remote_id));

        match self.executor.execute(StoreTarget::Remote, &sql, &values).await {
            Ok(_) => debug!(
                user_id = user_id,
                remote_user_id = remote_id,
                fields = mirrored.len(),
                "Mirrored profile to remote store"
            ),
            Err(DbError::StoreUnavailable(_)) => {
                debug!(user_id = user_id, "Remote store unavailable, profile kept local only")
            }
            Err(e) => warn!(
                error = %e,
                user_id = user_id,
                remote_user_id = remote_id,
                "Failed to mirror profile to remote store"
            ),
        }
    }
}

async fn hash_in_background(password: String) -> Result<String, UserError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| UserError::PasswordHash(e.to_string()))?
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::OAuthIdentity;
    use crate::common::test_support::test_executor;
    use sqlx::SqlitePool;

    fn password_user(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: name.to_string(),
            password: Some("Secret123".to_string()),
            oauth: None,
            picture_url: None,
        }
    }

    fn google_user(email: &str, sub: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Google Reader".to_string(),
            password: None,
            oauth: Some(OAuthIdentity {
                provider: "google".to_string(),
                provider_id: sub.to_string(),
                access_token: None,
            }),
            picture_url: Some("https://example.com/p.png".to_string()),
        }
    }

    fn remote(service: &UserService) -> SqlitePool {
        service
            .executor
            .stores()
            .pool(StoreTarget::Remote)
            .unwrap()
            .clone()
    }

    async fn remote_user_count(pool: &SqlitePool, email: &str) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users_personalized WHERE email = ?")
                .bind(email)
                .fetch_one(pool)
                .await
                .unwrap();
        count
    }

    #[tokio::test]
    async fn test_create_user_without_remote_is_degraded_not_failed() {
        let service = UserService::new(test_executor(false).await);

        let user = service
            .create_user(password_user("a@b.com", "A"))
            .await
            .unwrap();

        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.remote_user_id, None);
        assert!(user.password_hash.is_some());
        assert_eq!(user.oauth_provider, None);
    }

    #[tokio::test]
    async fn test_create_user_mirrors_and_records_remote_id() {
        let service = UserService::new(test_executor(true).await);

        let user = service
            .create_user(password_user("mirror@example.com", "Mirror"))
            .await
            .unwrap();

        assert!(user.remote_user_id.is_some());
        assert!(user.last_synced_at.is_some());
        assert_eq!(remote_user_count(&remote(&service), "mirror@example.com").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_before_remote_write() {
        let service = UserService::new(test_executor(true).await);
        service
            .create_user(password_user("dup@example.com", "First"))
            .await
            .unwrap();

        let err = service
            .create_user(password_user("dup@example.com", "Second"))
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::DuplicateEmail));
        assert_eq!(remote_user_count(&remote(&service), "dup@example.com").await, 1);
    }

    #[tokio::test]
    async fn test_remote_mirror_failure_keeps_local_user() {
        let service = UserService::new(test_executor(true).await);
        sqlx::query("INSERT INTO users_personalized (email, name) VALUES ('taken@example.com', 'X')")
            .execute(&remote(&service))
            .await
            .unwrap();

        let user = service
            .create_user(password_user("taken@example.com", "Local"))
            .await
            .unwrap();

        assert_eq!(user.name, "Local");
        assert_eq!(user.remote_user_id, None);
    }

    #[tokio::test]
    async fn test_statement_breaking_name_is_stored_verbatim() {
        let service = UserService::new(test_executor(false).await);
        let hostile = "Robert'); DROP TABLE users;--";

        let user = service
            .create_user(password_user("bobby@example.com", hostile))
            .await
            .unwrap();
        assert_eq!(user.name, hostile);

        let found = service.get_user_by_email("bobby@example.com").await.unwrap();
        assert_eq!(found.unwrap().name, hostile);
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let service = UserService::new(test_executor(false).await);
        service
            .create_user(password_user("login@example.com", "Login"))
            .await
            .unwrap();

        let user = service
            .verify_credentials("login@example.com", "Secret123")
            .await
            .unwrap();
        assert!(user.last_login_at.is_some());

        let wrong = service
            .verify_credentials("login@example.com", "Secret124")
            .await;
        assert!(matches!(wrong, Err(UserError::InvalidCredentials)));

        let unknown = service
            .verify_credentials("nobody@example.com", "Secret123")
            .await;
        assert!(matches!(unknown, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_oauth_only_account_cannot_password_login() {
        let service = UserService::new(test_executor(false).await);
        let user = service
            .create_user(google_user("g@example.com", "sub-1"))
            .await
            .unwrap();
        assert!(user.email_verified);

        let result = service.verify_credentials("g@example.com", "").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_find_or_create_oauth_user() {
        let service = UserService::new(test_executor(false).await);

        let first = service
            .find_or_create_oauth_user(google_user("g@example.com", "sub-1"))
            .await
            .unwrap();
        let again = service
            .find_or_create_oauth_user(google_user("g@example.com", "sub-1"))
            .await
            .unwrap();
        assert_eq!(first.id, again.id);

        service
            .create_user(password_user("pw@example.com", "Pw"))
            .await
            .unwrap();
        let clash = service
            .find_or_create_oauth_user(google_user("pw@example.com", "sub-2"))
            .await;
        assert!(matches!(clash, Err(UserError::EmailRegisteredWithOtherMethod)));
    }

    #[tokio::test]
    async fn test_update_profile_writes_local_and_mirrors_subset() {
        let service = UserService::new(test_executor(true).await);
        let user = service
            .create_user(password_user("p@example.com", "Before"))
            .await
            .unwrap();

        let update = ProfileUpdate {
            name: Some("After".to_string()),
            hobbies: Some(vec!["chess".to_string()]),
            primary_interests: Some(vec!["science".to_string(), "ai".to_string()]),
            credibility_threshold: Some(0.8),
            ..Default::default()
        };
        let written = service.update_profile(user.id, &update).await.unwrap();
        assert_eq!(written, 4);

        let local = service.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(local.name, "After");
        assert_eq!(local.hobbies.as_deref(), Some(r#"["chess"]"#));
        assert!(local.updated_at.is_some());

        let (name, interests, threshold): (Option<String>, Option<String>, Option<f64>) =
            sqlx::query_as(
                "SELECT name, primary_interests, credibility_threshold FROM users_personalized WHERE id = ?",
            )
            .bind(local.remote_user_id.unwrap())
            .fetch_one(&remote(&service))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("After"));
        assert_eq!(interests.as_deref(), Some(r#"["science","ai"]"#));
        assert_eq!(threshold, Some(0.8));
    }

    #[tokio::test]
    async fn test_update_profile_without_remote_id_skips_mirror() {
        let service = UserService::new(test_executor(true).await);
        sqlx::query("INSERT INTO users (email, name) VALUES ('local@example.com', 'Local')")
            .execute(service.executor.stores().local())
            .await
            .unwrap();
        let user = service
            .get_user_by_email("local@example.com")
            .await
            .unwrap()
            .unwrap();

        let update = ProfileUpdate {
            age_range: Some("25-34".to_string()),
            ..Default::default()
        };
        assert_eq!(service.update_profile(user.id, &update).await.unwrap(), 1);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users_personalized")
            .fetch_one(&remote(&service))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_update_profile_unknown_user() {
        let service = UserService::new(test_executor(false).await);
        let update = ProfileUpdate {
            name: Some("Ghost".to_string()),
            ..Default::default()
        };

        let result = service.update_profile(999, &update).await;
        assert!(matches!(result, Err(UserError::NotFound)));
    }
}

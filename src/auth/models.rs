//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::serialize_json_list;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

/// Column list matching [`User`]; credentials other than the hash are never read back
pub const USER_COLUMNS: &str = "id, email, name, password_hash, oauth_provider, oauth_provider_id, \
     picture_url, email_verified, is_active, remote_user_id, age_range, education_level, \
     field_of_study, primary_interests, secondary_interests, hobbies, topics_to_avoid, \
     preferred_complexity, preferred_article_length, news_frequency, preferred_content_types, \
     political_orientation, credibility_threshold, created_at, updated_at, last_login_at, \
     last_synced_at";

/// User database model (local store)
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub oauth_provider: Option<String>,
    #[serde(skip_serializing)]
    pub oauth_provider_id: Option<String>,
    pub picture_url: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub remote_user_id: Option<i64>,
    pub age_range: Option<String>,
    pub education_level: Option<String>,
    pub field_of_study: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub primary_interests: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub secondary_interests: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub hobbies: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub topics_to_avoid: Option<String>,
    pub preferred_complexity: Option<String>,
    pub preferred_article_length: Option<String>,
    pub news_frequency: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub preferred_content_types: Option<String>,
    pub political_orientation: Option<String>,
    pub credibility_threshold: Option<f64>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub last_login_at: Option<String>,
    pub last_synced_at: Option<String>,
}

/// External identity attached to a new account
#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub provider: String,
    pub provider_id: String,
    pub access_token: Option<String>,
}

/// Input for `UserService::create_user`
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub oauth: Option<OAuthIdentity>,
    pub picture_url: Option<String>,
}

/// Registration request body
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Login request body
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Google ID token payload for OAuth
#[derive(Deserialize)]
pub struct GoogleIdTokenPayload {
    pub id_token: String,
}

/// Onboarding gate request body
#[derive(Deserialize)]
pub struct PasswordVerification {
    pub password: String,
}

/// Token issued on successful register/login/OAuth
#[derive(Serialize, Debug)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

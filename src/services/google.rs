// src/services/google.rs
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google OAuth not configured")]
    NotConfigured,

    #[error("invalid id_token: {0}")]
    InvalidToken(String),

    #[error("token missing required fields")]
    MissingClaims,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
}

/// Verified identity extracted from a Google ID token
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleService {
    http: Client,
    client_id: Option<String>,
}

impl GoogleService {
    pub fn new(http: Client, client_id: Option<String>) -> Self {
        if client_id.is_some() {
            info!("Google sign-in enabled");
        } else {
            info!("GOOGLE_CLIENT_ID not set, Google sign-in disabled");
        }
        Self { http, client_id }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
    }

    /// Validate an ID token with Google's tokeninfo endpoint
    /// Docs: https://developers.google.com/identity/sign-in/web/backend-auth
    pub async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, GoogleError> {
        let client_id = self.client_id.as_deref().ok_or(GoogleError::NotConfigured)?;

        debug!("Initiating Google token validation with tokeninfo endpoint");

        let response = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = TOKENINFO_URL, "HTTP error contacting Google tokeninfo endpoint");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if status.is_client_error() {
            warn!(http_status = %status, "Google tokeninfo rejected the token");
            return Err(GoogleError::InvalidToken(
                "invalid or expired id_token".to_string(),
            ));
        }
        if !status.is_success() {
            warn!(http_status = %status, "Google tokeninfo returned error status");
            return Err(GoogleError::RequestFailed(format!(
                "tokeninfo returned {}",
                status
            )));
        }

        let claims: Value = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google tokeninfo JSON response");
            GoogleError::InvalidToken("malformed id_token".to_string())
        })?;

        identity_from_claims(&claims, client_id, Utc::now().timestamp())
    }
}

/// tokeninfo encodes numbers and booleans as strings; accept either form
fn claim_i64(claims: &Value, key: &str) -> Option<i64> {
    match claims.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn claim_str(claims: &Value, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

pub fn identity_from_claims(
    claims: &Value,
    client_id: &str,
    now_ts: i64,
) -> Result<GoogleIdentity, GoogleError> {
    match claim_str(claims, "aud") {
        Some(aud) if aud == client_id => {}
        Some(aud) => {
            warn!(token_audience = %aud, "Google token audience mismatch");
            return Err(GoogleError::InvalidToken("token audience mismatch".to_string()));
        }
        None => return Err(GoogleError::InvalidToken("token missing audience".to_string())),
    }

    if let Some(exp) = claim_i64(claims, "exp") {
        if exp < now_ts {
            warn!(token_exp = exp, current_time = now_ts, "Google token has expired");
            return Err(GoogleError::InvalidToken("token has expired".to_string()));
        }
    }

    let (sub, email) = match (claim_str(claims, "sub"), claim_str(claims, "email")) {
        (Some(sub), Some(email)) => (sub, email),
        (sub, email) => {
            warn!(
                has_sub = sub.is_some(),
                has_email = email.is_some(),
                "Google token missing required fields (email/sub)"
            );
            return Err(GoogleError::MissingClaims);
        }
    };

    Ok(GoogleIdentity {
        sub,
        email,
        name: claim_str(claims, "name"),
        picture: claim_str(claims, "picture"),
    })
}

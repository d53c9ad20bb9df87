// rate_limit_middleware.rs
use crate::auth::tokens::{bearer_token, decode_token};
use crate::common::{ApiError, AppState};
use crate::services::rate_limit::RateLimitResult;
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Extract IP address from request
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the chain
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    // Try X-Real-IP header
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.trim().to_string());
        }
    }

    // Fall back to connection info
    connect_info.map(|info| info.0.ip().to_string())
}

/// `user_<id>` from a valid bearer token. The signature is checked but the
/// user row is not loaded.
fn extract_user_identifier(headers: &HeaderMap, jwt_secret: &str) -> Option<String> {
    let token = bearer_token(headers)?;
    decode_token(jwt_secret, token)
        .ok()
        .map(|claims| format!("user_{}", claims.sub))
}

/// Per-client key: authenticated user, else client IP
fn rate_limit_identifier(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    jwt_secret: &str,
) -> String {
    extract_user_identifier(headers, jwt_secret)
        .or_else(|| extract_ip_address(headers, connect_info).map(|ip| format!("ip_{}", ip)))
        .unwrap_or_else(|| "ip_unknown".to_string())
}

/// Rate limiting middleware, keyed by client identifier and request path
pub async fn rate_limit_middleware(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (rate_limit_service, jwt_secret) = {
        let state = state_lock.read().await;
        (state.rate_limit_service.clone(), state.jwt_secret.clone())
    };

    let identifier = rate_limit_identifier(request.headers(), connect_info.as_ref(), &jwt_secret);
    let path = request.uri().path().to_string();

    match rate_limit_service.check_and_record(&identifier, &path).await {
        RateLimitResult::Allowed => {
            debug!(
                identifier = %identifier,
                path = %path,
                "Request allowed by rate limiter"
            );
            Ok(next.run(request).await)
        }
        limited @ RateLimitResult::Limited { retry_after, .. } => {
            rate_limit_service.log_violation(&identifier, &path, &limited);
            Err(ApiError::RateLimited { retry_after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Claims;
    use axum::http::HeaderMap;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(sub: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: "r@example.com".to_string(),
            name: "R".to_string(),
            exp: 9999999999,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        let ip = extract_ip_address(&headers, None);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        let ip = extract_ip_address(&headers, None);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_falls_back_to_peer_address() {
        let peer = ConnectInfo("192.0.2.7:5000".parse::<SocketAddr>().unwrap());
        let ip = extract_ip_address(&HeaderMap::new(), Some(&peer));
        assert_eq!(ip, Some("192.0.2.7".to_string()));
    }

    #[test]
    fn test_identifier_uses_user_id_from_valid_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token_for("42", "secret")).parse().unwrap(),
        );
        headers.insert("x-forwarded-for", "203.0.113.1".parse().unwrap());

        assert_eq!(rate_limit_identifier(&headers, None, "secret"), "user_42");
    }

    #[test]
    fn test_identifier_ignores_forged_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token_for("42", "forged")).parse().unwrap(),
        );
        headers.insert("x-forwarded-for", "203.0.113.1".parse().unwrap());

        assert_eq!(
            rate_limit_identifier(&headers, None, "secret"),
            "ip_203.0.113.1"
        );
    }

    #[test]
    fn test_identifier_without_any_source() {
        assert_eq!(
            rate_limit_identifier(&HeaderMap::new(), None, "secret"),
            "ip_unknown"
        );
    }
}

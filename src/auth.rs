//! Admin password check and HTTP Basic Authentication for admin routes.
//!
//! The password is a plaintext shared secret; the only hardening is a
//! constant-time comparison.

use crate::error::AppError;
use crate::session::Session;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Used when QUIZ_ADMIN_PASSWORD is not set
pub const DEFAULT_ADMIN_PASSWORD: &str = "112233";

/// Plaintext equality, in constant time
pub fn verify_password(expected: &str, candidate: &str) -> bool {
    constant_time_eq(expected.as_bytes(), candidate.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Decode `Authorization: Basic ...` into (username, password)
fn basic_credentials(request: &Request<Body>) -> Option<(String, String)> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Middleware for HTTP Basic Authentication on admin routes.
/// Any username is accepted; the password must be the admin password.
pub async fn admin_auth_middleware(
    State(session): State<Session>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some((_, password)) = basic_credentials(&request) {
        if verify_password(&session.config.admin_password, &password) {
            return next.run(request).await;
        }
        tracing::warn!("Rejected admin request to {}", request.uri().path());
    }

    AppError::Unauthorized.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/questions/import");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_verify_password() {
        assert!(verify_password("112233", "112233"));
        assert!(!verify_password("112233", "11223"));
        assert!(!verify_password("112233", "112234"));
        assert!(!verify_password("112233", ""));
    }

    #[test]
    fn test_basic_credentials() {
        // "admin:secret" -> "YWRtaW46c2VjcmV0"
        let req = request_with(Some("Basic YWRtaW46c2VjcmV0"));
        assert_eq!(
            basic_credentials(&req),
            Some(("admin".to_string(), "secret".to_string()))
        );

        // Passwords may contain colons
        let encoded = STANDARD.encode("quizmaster:a:b");
        let req = request_with(Some(&format!("Basic {}", encoded)));
        assert_eq!(
            basic_credentials(&req),
            Some(("quizmaster".to_string(), "a:b".to_string()))
        );
    }

    #[test]
    fn test_basic_credentials_rejects_garbage() {
        assert_eq!(basic_credentials(&request_with(None)), None);
        assert_eq!(basic_credentials(&request_with(Some("Bearer abc"))), None);
        assert_eq!(basic_credentials(&request_with(Some("Basic !!!"))), None);
        // "nocolon"
        assert_eq!(basic_credentials(&request_with(Some("Basic bm9jb2xvbg=="))), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}

//! Authentication Middleware
//! Mission: Gate protected routes on a valid token, and optionally on the admin role

use crate::auth::{
    jwt::{CredentialError, TokenService},
    models::Claims,
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Render a 401. Every authentication failure goes through here so the
/// body shape never varies between failure causes.
pub fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

/// Auth middleware that validates bearer tokens
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = tokens.verify_headers(req.headers()).map_err(|e| {
        debug!(path = %req.uri().path(), reason = %e, "Rejected unauthenticated request");
        AuthError::from(e)
    })?;

    // Handlers receive the claims as `Extension<Claims>`
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Role gate; must be layered inside `require_auth`
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    let claims = extract_claims(&req).ok_or(AuthError::MissingToken)?;

    if !claims.is_admin {
        debug!(user_id = %claims.sub, "Rejected non-admin request");
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

/// Auth error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    Forbidden,
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::MissingCredential => AuthError::MissingToken,
            CredentialError::InvalidCredential => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingToken => unauthorized("Missing authorization token"),
            AuthError::InvalidToken => unauthorized("Invalid or expired token"),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Admin access required" })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request as HttpRequest},
        middleware,
        routing::get,
        Extension, Router,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "middleware-test-secret";

    fn create_test_user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_admin,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    async fn whoami(Extension(claims): Extension<Claims>) -> String {
        claims.sub.to_string()
    }

    fn test_app(tokens: Arc<TokenService>) -> Router {
        let admin = Router::new()
            .route("/admin", get(|| async { "admin area" }))
            .route_layer(middleware::from_fn(require_admin));

        Router::new()
            .route("/me", get(whoami))
            .merge(admin)
            .route_layer(middleware::from_fn_with_state(tokens, require_auth))
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(SECRET, Duration::hours(1)).unwrap())
    }

    async fn call(app: Router, uri: &str, auth: Option<String>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_auth_error_responses() {
        assert_eq!(
            AuthError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_extract_claims_from_request() {
        let mut req = HttpRequest::new(Body::empty());
        assert!(extract_claims(&req).is_none());

        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            is_admin: false,
            iat: 1,
            exp: 1234567890,
        };
        req.extensions_mut().insert(claims.clone());

        assert_eq!(extract_claims(&req), Some(&claims));
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler_with_claims() {
        let tokens = tokens();
        let user = create_test_user(false);
        let token = tokens.issue(&user).unwrap();

        let (status, body) = call(test_app(tokens), "/me", Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user.id.to_string());
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let (status, body) = call(test_app(tokens()), "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Missing authorization token"));
    }

    #[tokio::test]
    async fn test_expired_and_malformed_tokens_look_identical() {
        let expired = TokenService::new(SECRET, Duration::seconds(-30)).unwrap();
        let expired_token = expired.issue(&create_test_user(false)).unwrap();

        let forged = TokenService::new("other-secret", Duration::hours(1)).unwrap();
        let forged_token = forged.issue(&create_test_user(false)).unwrap();

        let app = test_app(tokens());
        let (s1, b1) = call(app.clone(), "/me", Some(format!("Bearer {expired_token}"))).await;
        let (s2, b2) = call(app.clone(), "/me", Some("Bearer not.a.token".to_string())).await;
        let (s3, b3) = call(app, "/me", Some(format!("Bearer {forged_token}"))).await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(s3, StatusCode::UNAUTHORIZED);
        assert_eq!(b1, b2);
        assert_eq!(b2, b3);
    }

    #[tokio::test]
    async fn test_admin_gate_rejects_plain_user() {
        let tokens = tokens();
        let token = tokens.issue(&create_test_user(false)).unwrap();

        let (status, body) = call(test_app(tokens), "/admin", Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("Admin access required"));
    }

    #[tokio::test]
    async fn test_admin_gate_admits_admin() {
        let tokens = tokens();
        let token = tokens.issue(&create_test_user(true)).unwrap();

        let (status, body) = call(test_app(tokens), "/admin", Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin area");
    }

    #[tokio::test]
    async fn test_admin_gate_without_auth_layer_is_unauthorized() {
        let app = Router::new()
            .route("/admin", get(|| async { "admin area" }))
            .route_layer(middleware::from_fn(require_admin));

        let (status, _) = call(app, "/admin", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

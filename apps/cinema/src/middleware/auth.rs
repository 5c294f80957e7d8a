//! Authentication middleware for the cinema API.
//!
//! Provides JWT validation and staff-based access control.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::{self as axum_mw, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::{AppError, Result};
use crate::services::auth::Claims;
use crate::AppState;

/// Extracts the Bearer token from the Authorization header.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn claims_of(request: &Request<Body>) -> Result<&Claims> {
    request
        .extensions()
        .get::<Claims>()
        .ok_or(AppError::Unauthorized)
}

/// Authentication middleware that validates JWT tokens.
///
/// Extracts the Bearer token from the Authorization header, validates it,
/// and adds the claims to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(&request).ok_or(AppError::Unauthorized)?;

    let claims = state.auth_service().verify_token(token)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Rejects requests from non-staff users with 403.
///
/// Must be used after `auth_middleware`.
pub async fn require_staff(request: Request<Body>, next: Next) -> Result<Response> {
    let claims = claims_of(&request)?;

    if !claims.is_staff() {
        tracing::debug!(
            user_id = claims.sub,
            method = %request.method(),
            path = %request.uri().path(),
            "Write rejected for non-staff user"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

/// Puts the handlers of `route` behind [`require_staff`].
///
/// Only the registered handlers are wrapped, so methods the route does not
/// handle still answer 405. A `Router::route_layer` would also wrap that
/// fallback.
pub fn staff_only<S>(route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(axum_mw::from_fn(require_staff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserRole;
    use axum::{
        http::{Method, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn claims(role: UserRole) -> Claims {
        Claims {
            sub: 1,
            role,
            exp: usize::MAX,
            iat: 0,
        }
    }

    fn catalog_router() -> Router {
        Router::new()
            .route(
                "/",
                get(|| async { "read" }).merge(staff_only(post(|| async { "written" }))),
            )
            .route("/:id/action", staff_only(post(|| async { "acted" })))
    }

    async fn send(uri: &str, method: Method, claims: Option<Claims>) -> StatusCode {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        if let Some(claims) = claims {
            request.extensions_mut().insert(claims);
        }
        catalog_router().oneshot(request).await.unwrap().status()
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer my-token-123")
            .body(Body::empty())
            .unwrap();

        let token = extract_bearer_token(&request);
        assert_eq!(token, Some("my-token-123"));
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let request = Request::builder().body(Body::empty()).unwrap();

        let token = extract_bearer_token(&request);
        assert_eq!(token, None);
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Token dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let token = extract_bearer_token(&request);
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn test_user_can_read_but_not_write() {
        let user = Some(claims(UserRole::User));
        assert_eq!(send("/", Method::GET, user.clone()).await, StatusCode::OK);
        assert_eq!(send("/", Method::POST, user.clone()).await, StatusCode::FORBIDDEN);
        assert_eq!(send("/1/action", Method::POST, user).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_staff_can_write() {
        let staff = Some(claims(UserRole::Staff));
        assert_eq!(send("/", Method::POST, staff.clone()).await, StatusCode::OK);
        assert_eq!(send("/1/action", Method::POST, staff).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unhandled_method_is_not_allowed_for_any_role() {
        for role in [UserRole::User, UserRole::Staff] {
            for method in [Method::PUT, Method::PATCH, Method::DELETE] {
                assert_eq!(
                    send("/", method.clone(), Some(claims(role))).await,
                    StatusCode::METHOD_NOT_ALLOWED
                );
            }
            assert_eq!(
                send("/1/action", Method::GET, Some(claims(role))).await,
                StatusCode::METHOD_NOT_ALLOWED
            );
        }
    }

    #[tokio::test]
    async fn test_write_without_claims_is_unauthorized() {
        assert_eq!(send("/", Method::POST, None).await, StatusCode::UNAUTHORIZED);
    }
}

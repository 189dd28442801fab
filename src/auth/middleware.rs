use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{extract_bearer_token, AuthError, AuthService, UserRole, UserSession};

/// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let session = auth_service.validate_session(token).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

fn session_role(request: &Request) -> Result<UserRole, AuthError> {
    request
        .extensions()
        .get::<UserSession>()
        .map(|session| session.role)
        .ok_or(AuthError::InsufficientPermissions)
}

/// Admin-only middleware
pub async fn admin_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    if session_role(&request)? != UserRole::Admin {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Trainer or Admin middleware
pub async fn trainer_or_admin_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    if !session_role(&request)?.can_access(&UserRole::Trainer) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

pub fn security_headers_layer() -> tower_http::set_header::SetResponseHeaderLayer<HeaderValue> {
    tower_http::set_header::SetResponseHeaderLayer::overriding(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    )
}

/// Sliding-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> bool {
        let mut requests = self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        let entry = requests.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .or_else(|| request.headers().get("x-real-ip"))
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .unwrap_or("unknown")
        .to_string();

    if !rate_limiter.check_rate_limit(&client_ip) {
        tracing::warn!(%client_ip, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "success": false, "error": "Too many requests, try again later" })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.check_rate_limit("client1"));
        assert!(limiter.check_rate_limit("client1"));
        assert!(limiter.check_rate_limit("client1"));
        assert!(!limiter.check_rate_limit("client1"));

        assert!(limiter.check_rate_limit("client2"));
    }

    fn router_with_role(role: UserRole) -> Router {
        Router::new()
            .route("/admin", get(|| async { "admin" }))
            .route_layer(middleware::from_fn(admin_only_middleware))
            .merge(
                Router::new()
                    .route("/trainer", get(|| async { "trainer" }))
                    .route_layer(middleware::from_fn(trainer_or_admin_middleware)),
            )
            .layer(middleware::from_fn(move |mut request: Request, next: Next| async move {
                request.extensions_mut().insert(UserSession {
                    user_id: Uuid::new_v4(),
                    email: "someone@example.com".to_string(),
                    role,
                    jti: Uuid::new_v4().to_string(),
                });
                next.run(request).await
            }))
    }

    async fn status_for(role: UserRole, path: &str) -> StatusCode {
        router_with_role(role)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_role_guards() {
        assert_eq!(status_for(UserRole::Admin, "/admin").await, StatusCode::OK);
        assert_eq!(status_for(UserRole::Trainer, "/admin").await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(UserRole::Member, "/admin").await, StatusCode::FORBIDDEN);

        assert_eq!(status_for(UserRole::Admin, "/trainer").await, StatusCode::OK);
        assert_eq!(status_for(UserRole::Trainer, "/trainer").await, StatusCode::OK);
        assert_eq!(status_for(UserRole::Member, "/trainer").await, StatusCode::FORBIDDEN);
    }
}

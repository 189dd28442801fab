use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::{
    extract::WithRejection,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use validator::Validate;

use crate::auth::{
    jwt_auth_middleware, rate_limit_middleware, AuthResponse, AuthService, ChangePasswordRequest,
    LoginRequest, RateLimiter, RefreshTokenRequest, RegisterRequest, TokenResponse, UpdateProfileRequest,
    UserInfo, UserSession,
};
use crate::error::{AppError, AppResult};
use crate::models::{validate_phone, ApiResponse, MessageResponse};

/// Authentication routes
pub fn auth_routes(auth_service: AuthService, rate_limiter: RateLimiter) -> Router {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route_layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            auth_service.clone(),
            jwt_auth_middleware,
        ));

    public.merge(protected).with_state(auth_service)
}

/// Register a new member
#[tracing::instrument(skip(auth_service, request))]
async fn register(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    request.validate()?;
    validate_phone(request.phone.as_deref())?;

    let response = auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[tracing::instrument(skip(auth_service, request))]
async fn login(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<AuthResponse>> {
    let response = auth_service.login(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(auth_service, request))]
async fn refresh_token(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<RefreshTokenRequest>, AppError>,
) -> AppResult<Json<TokenResponse>> {
    let response = auth_service.refresh_token(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(auth_service, bearer, session), fields(user_id = %session.user_id))]
async fn logout(
    State(auth_service): State<AuthService>,
    Extension(session): Extension<UserSession>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> AppResult<Json<MessageResponse>> {
    auth_service.logout(bearer.token()).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

#[tracing::instrument(skip(auth_service, session), fields(user_id = %session.user_id))]
async fn get_profile(
    State(auth_service): State<AuthService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let profile = auth_service.profile(session.user_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

#[tracing::instrument(skip(auth_service, session, request), fields(user_id = %session.user_id))]
async fn update_profile(
    State(auth_service): State<AuthService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    request.validate()?;
    validate_phone(request.phone.as_deref())?;

    let profile = auth_service.update_profile(session.user_id, request).await?;
    Ok(Json(ApiResponse::with_message(profile, "Profile updated")))
}

#[tracing::instrument(skip(auth_service, session, request), fields(user_id = %session.user_id))]
async fn change_password(
    State(auth_service): State<AuthService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<ChangePasswordRequest>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    auth_service.change_password(session.user_id, request).await?;
    Ok(Json(MessageResponse::new("Password changed; please log in again on other devices")))
}

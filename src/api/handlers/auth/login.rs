//! Login endpoint: first issuance of a session lineage.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    audit::{self, AuditAction, AuditEvent},
    credentials::verify_credentials,
    rate_limit::{RateLimitAction, RateLimitDecision},
    state::AuthState,
    storage::insert_session,
    types::{LoginRequest, LoginResponse, UserSummary},
    utils::{normalize_email, valid_email, RequestContext},
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, new session issued", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = String),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response();
    }

    let context = RequestContext::from_headers(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(context.ip_address.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let user = match verify_credentials(&pool, &email, &request.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // One generic answer for unknown emails and wrong passwords.
            return (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            )
                .into_response();
        }
        Err(err) => {
            error!("Credential verification failed: {err}");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Temporarily unavailable".to_string(),
            )
                .into_response();
        }
    };

    let refresh = match auth_state.codec().issue_refresh_secret() {
        Ok(refresh) => refresh,
        Err(err) => {
            error!("Failed to issue refresh secret: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    let ttl_seconds = auth_state
        .codec()
        .refresh_lifetime_seconds(request.remember_me);
    let session_id = match insert_session(
        &pool,
        user.id,
        &refresh.hash,
        request.remember_me,
        ttl_seconds,
        &context,
    )
    .await
    {
        Ok(session_id) => session_id,
        Err(err) => {
            error!("Failed to create session: {err}");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Temporarily unavailable".to_string(),
            )
                .into_response();
        }
    };

    let (access_token, expires_in) = match auth_state.codec().issue_access_token(user.id, session_id)
    {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to issue access token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    audit::record(
        &pool,
        AuditEvent::new(AuditAction::Login)
            .with_user(user.id)
            .with_session(session_id)
            .with_ip(context.ip_address.clone())
            .with_detail("remember_me", json!(request.remember_me)),
    );

    let response = LoginResponse {
        access_token,
        refresh_token: refresh.secret,
        token_type: "Bearer".to_string(),
        expires_in,
        user: UserSummary {
            id: user.id,
            email: user.email,
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

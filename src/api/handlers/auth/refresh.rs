//! Refresh endpoint: rotate a presented refresh token.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    audit::{self, AuditAction, AuditEvent},
    rate_limit::{RateLimitAction, RateLimitDecision},
    rotation::{self, RotationDenial},
    state::AuthState,
    types::{RefreshRequest, RefreshResponse},
    utils::RequestContext,
};

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rotated", body = RefreshResponse),
        (status = 400, description = "Missing refresh token", body = String),
        (status = 401, description = "Invalid or reused refresh token", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let presented = request.refresh_token.trim();
    if presented.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing refresh token".to_string(),
        )
            .into_response();
    }

    let context = RequestContext::from_headers(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(context.ip_address.as_deref(), RateLimitAction::Refresh)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match rotation::rotate(&pool, auth_state.codec(), presented, &context).await {
        Ok(bundle) => {
            debug!(
                session_id = %bundle.session_id,
                user_id = %bundle.user_id,
                "Rotated refresh token"
            );
            let response = RefreshResponse {
                access_token: bundle.access_token,
                refresh_token: bundle.refresh_secret,
                token_type: "Bearer".to_string(),
                expires_in: bundle.expires_in,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(RotationDenial::InvalidToken) => {
            audit::record(
                &pool,
                AuditEvent::new(AuditAction::RefreshRejected).with_ip(context.ip_address.clone()),
            );
            (
                StatusCode::UNAUTHORIZED,
                "Invalid refresh token".to_string(),
            )
                .into_response()
        }
        Err(RotationDenial::Reuse {
            session_id,
            user_id,
        }) => {
            // Security-relevant regardless of audit availability: the lineage
            // was revoked because a spent token came back.
            warn!(
                %session_id,
                %user_id,
                ip = context.ip_address.as_deref().unwrap_or("unknown"),
                "Refresh token reuse detected; lineage revoked"
            );
            audit::record(
                &pool,
                AuditEvent::new(AuditAction::RefreshReused)
                    .with_user(user_id)
                    .with_session(session_id)
                    .with_ip(context.ip_address.clone()),
            );
            (
                StatusCode::UNAUTHORIZED,
                "Refresh token reuse detected".to_string(),
            )
                .into_response()
        }
        Err(RotationDenial::Unavailable) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Temporarily unavailable".to_string(),
        )
            .into_response(),
    }
}

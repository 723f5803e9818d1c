//! Session management endpoints: list, terminate one, terminate all.
//!
//! These operate on lineage ids, never on token hashes; a session keeps its
//! id across rotations, so the list stays stable while credentials change.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    audit::{self, AuditAction, AuditEvent},
    principal::{require_auth, Principal},
    state::AuthState,
    storage,
    types::{SessionSummary, SessionsResponse, TerminateAllRequest, TerminateAllResponse,
        TerminateResponse},
    utils::{hash_refresh_secret, RequestContext},
};

#[utoipa::path(
    get,
    path = "/auth/sessions",
    responses(
        (status = 200, description = "Active sessions for the caller", body = SessionsResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "sessions"
)]
pub async fn list_sessions(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let sessions = match storage::list_active_sessions(&pool, principal.user_id).await {
        Ok(sessions) => sessions,
        Err(err) => {
            error!("Failed to list sessions: {err}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    let response = SessionsResponse {
        sessions: sessions
            .into_iter()
            .map(|session| SessionSummary {
                current: session.id == principal.session_id,
                id: session.id,
                device: session.device,
                browser: session.browser,
                ip: session.ip_address,
                last_activity: session.last_activity_unix,
            })
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    delete,
    path = "/auth/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session id to terminate")
    ),
    responses(
        (status = 200, description = "Session terminated", body = TerminateResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Session not found or not owned by the caller", body = String)
    ),
    tag = "sessions"
)]
pub async fn terminate_session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(session_id): Path<Uuid>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let terminated = match storage::terminate_session(&pool, principal.user_id, session_id).await {
        Ok(terminated) => terminated,
        Err(err) => {
            error!("Failed to terminate session: {err}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    if !terminated {
        // Absent, foreign, and already-revoked ids all answer the same way.
        return (StatusCode::FORBIDDEN, "Session not found".to_string()).into_response();
    }

    let context = RequestContext::from_headers(&headers);
    audit::record(
        &pool,
        AuditEvent::new(AuditAction::SessionTerminated)
            .with_user(principal.user_id)
            .with_session(session_id)
            .with_ip(context.ip_address),
    );

    let response = TerminateResponse {
        message: "Session terminated".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    delete,
    path = "/auth/sessions/all",
    request_body = TerminateAllRequest,
    responses(
        (status = 200, description = "All sessions terminated", body = TerminateAllResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "sessions"
)]
pub async fn terminate_all_sessions(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TerminateAllRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let request = payload.map_or_else(TerminateAllRequest::default, |Json(payload)| payload);

    let keep = if request.keep_current {
        Some(current_session_id(&pool, &principal, request.refresh_token.as_deref()).await)
    } else {
        None
    };

    let count = match storage::terminate_all(&pool, principal.user_id, keep).await {
        Ok(count) => count,
        Err(err) => {
            error!("Failed to terminate sessions: {err}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    let context = RequestContext::from_headers(&headers);
    audit::record(
        &pool,
        AuditEvent::new(AuditAction::SessionsTerminatedAll)
            .with_user(principal.user_id)
            .with_session(principal.session_id)
            .with_ip(context.ip_address)
            .with_detail("count", json!(count))
            .with_detail("kept_current", json!(request.keep_current)),
    );

    let response = TerminateAllResponse {
        message: "All sessions terminated".to_string(),
        count,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Which lineage counts as "current" for keep-current termination.
///
/// A presented refresh token wins when it resolves to a session the caller
/// owns; otherwise the `sid` claim of the access token is used.
async fn current_session_id(
    pool: &PgPool,
    principal: &Principal,
    refresh_token: Option<&str>,
) -> Uuid {
    let Some(token) = refresh_token.map(str::trim).filter(|token| !token.is_empty()) else {
        return principal.session_id;
    };

    let hash = hash_refresh_secret(token);
    match storage::classify_token(pool, &hash).await {
        Ok(Some(standing)) if standing.user_id == principal.user_id => standing.session_id,
        Ok(_) => principal.session_id,
        Err(err) => {
            error!("Failed to resolve refresh token to a session: {err}");
            principal.session_id
        }
    }
}

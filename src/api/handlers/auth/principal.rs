//! Authenticated principal extraction for access-token-protected routes.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};

use super::state::AuthState;

/// Authenticated caller context derived from a bearer access token.
#[derive(Clone, Copy, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub session_id: uuid::Uuid,
}

/// Resolve the `Authorization` header into a principal, or return 401.
///
/// Verification is stateless: the token's signature and expiry are checked,
/// nothing is looked up in the store.
pub(super) fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<Principal, StatusCode> {
    let token = extract_bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = state
        .codec()
        .verify_access_token(&token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    match (claims.user_id(), claims.session_id()) {
        (Some(user_id), Some(session_id)) => Ok(Principal {
            user_id,
            session_id,
        }),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

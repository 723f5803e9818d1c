//! Database access for session lineages and refresh token history.
//!
//! All cross-request coordination happens through these queries; there is no
//! in-process session state. The conditional update in [`consume_live_token`]
//! is the serialization point for rotation: of two concurrent calls with the
//! same hash, exactly one matches the `consumed_at IS NULL` predicate.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::RequestContext;

/// Live token consumed by the rotation winner.
pub(super) struct ConsumedToken {
    pub(super) session_id: Uuid,
    pub(super) user_id: Uuid,
}

/// Where a presented token hash stands after a failed conditional consume.
#[derive(Debug)]
pub(super) struct TokenStanding {
    pub(super) session_id: Uuid,
    pub(super) user_id: Uuid,
    pub(super) consumed: bool,
    pub(super) session_revoked: bool,
    pub(super) expired: bool,
}

/// One row of the session list shown to the user.
pub(crate) struct SessionOverview {
    pub(crate) id: Uuid,
    pub(crate) device: Option<String>,
    pub(crate) browser: Option<String>,
    pub(crate) ip_address: Option<String>,
    pub(crate) last_activity_unix: i64,
}

/// Create a new session lineage with its first history entry.
///
/// The absolute expiry is fixed here; rotations never extend it.
pub(super) async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &[u8],
    remember_me: bool,
    ttl_seconds: i64,
    context: &RequestContext,
) -> Result<Uuid> {
    let mut tx = pool.begin().await.context("begin login transaction")?;

    let query = r"
        INSERT INTO sessions
            (user_id, current_token_hash, remember_me, device, browser, ip_address, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW() + ($7 * INTERVAL '1 second'))
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(remember_me)
        .bind(context.device.as_deref())
        .bind(context.browser.as_deref())
        .bind(context.ip_address.as_deref())
        .bind(ttl_seconds)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert session")?;

    let session_id: Uuid = row.get("id");

    let query = r"
        INSERT INTO session_tokens (session_id, token_hash)
        VALUES ($1, $2)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .bind(token_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert initial session token")?;

    tx.commit().await.context("commit login transaction")?;

    Ok(session_id)
}

/// Atomically consume the live history entry for `token_hash`.
///
/// Matches only when the entry is unconsumed and the owning session is still
/// active and unexpired; returns `None` when another rotation won the race,
/// the token was already consumed, or the lineage is revoked/expired. The
/// caller must reclassify with a fresh [`classify_token`] lookup.
pub(super) async fn consume_live_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    token_hash: &[u8],
    superseded_by_hash: &[u8],
) -> Result<Option<ConsumedToken>> {
    let query = r"
        UPDATE session_tokens st
        SET consumed_at = NOW(), superseded_by_hash = $2
        FROM sessions s
        WHERE st.token_hash = $1
          AND st.consumed_at IS NULL
          AND s.id = st.session_id
          AND s.state = 'active'
          AND s.expires_at > NOW()
        RETURNING s.id AS session_id, s.user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(superseded_by_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume live session token")?;

    Ok(row.map(|row| ConsumedToken {
        session_id: row.get("session_id"),
        user_id: row.get("user_id"),
    }))
}

/// Attach the freshly issued token to the lineage the caller just rotated.
///
/// Runs in the same transaction as [`consume_live_token`] so the old entry,
/// the new entry, and the session pointer move as one unit.
pub(super) async fn attach_rotated_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session_id: Uuid,
    token_hash: &[u8],
    context: &RequestContext,
) -> Result<()> {
    let query = r"
        INSERT INTO session_tokens (session_id, token_hash)
        VALUES ($1, $2)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .bind(token_hash)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert rotated session token")?;

    // The session follows the client: metadata reflects the latest request,
    // but absent headers never wipe what a previous request reported.
    let query = r"
        UPDATE sessions
        SET current_token_hash = $2,
            last_activity_at = NOW(),
            device = COALESCE($3, device),
            browser = COALESCE($4, browser),
            ip_address = COALESCE($5, ip_address)
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .bind(token_hash)
        .bind(context.device.as_deref())
        .bind(context.browser.as_deref())
        .bind(context.ip_address.as_deref())
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update session after rotation")?;

    Ok(())
}

/// Fresh lookup of a presented hash, used to classify a failed consume.
pub(super) async fn classify_token(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<TokenStanding>> {
    let query = r"
        SELECT st.session_id,
               s.user_id,
               st.consumed_at IS NOT NULL AS consumed,
               s.state = 'revoked' AS session_revoked,
               s.expires_at <= NOW() AS expired
        FROM session_tokens st
        JOIN sessions s ON s.id = st.session_id
        WHERE st.token_hash = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to classify session token")?;

    Ok(row.map(|row| TokenStanding {
        session_id: row.get("session_id"),
        user_id: row.get("user_id"),
        consumed: row.get("consumed"),
        session_revoked: row.get("session_revoked"),
        expired: row.get("expired"),
    }))
}

/// Revoke a whole lineage and permanently consume its live entry, if any.
/// Idempotent: revoking an already-revoked lineage changes nothing.
pub(super) async fn revoke_lineage(pool: &PgPool, session_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await.context("begin revocation transaction")?;

    let query = r"
        UPDATE sessions
        SET state = 'revoked', revoked_at = NOW()
        WHERE id = $1 AND state = 'active'
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke session")?;

    let query = r"
        UPDATE session_tokens
        SET consumed_at = NOW()
        WHERE session_id = $1 AND consumed_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume live token for revoked session")?;

    tx.commit().await.context("commit revocation transaction")?;

    Ok(())
}

/// Active sessions for a user, most recently used first.
pub(super) async fn list_active_sessions(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<SessionOverview>> {
    let query = r"
        SELECT id, device, browser, ip_address,
               EXTRACT(EPOCH FROM last_activity_at)::BIGINT AS last_activity_unix
        FROM sessions
        WHERE user_id = $1 AND state = 'active' AND expires_at > NOW()
        ORDER BY last_activity_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list sessions")?;

    Ok(rows
        .into_iter()
        .map(|row| SessionOverview {
            id: row.get("id"),
            device: row.get("device"),
            browser: row.get("browser"),
            ip_address: row.get("ip_address"),
            last_activity_unix: row.get("last_activity_unix"),
        })
        .collect())
}

/// Terminate one session owned by `user_id`.
///
/// Returns `false` for absent, foreign, or already-revoked sessions alike,
/// so the caller cannot distinguish other users' session ids.
pub(super) async fn terminate_session(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin termination transaction")?;

    let query = r"
        UPDATE sessions
        SET state = 'revoked', revoked_at = NOW()
        WHERE id = $1 AND user_id = $2 AND state = 'active'
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to terminate session")?;

    if row.is_none() {
        tx.commit().await.context("commit termination noop")?;
        return Ok(false);
    }

    let query = r"
        UPDATE session_tokens
        SET consumed_at = NOW()
        WHERE session_id = $1 AND consumed_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume live token for terminated session")?;

    tx.commit().await.context("commit termination transaction")?;

    Ok(true)
}

/// Terminate every active session for a user, optionally keeping one.
/// Returns how many sessions were revoked.
pub(super) async fn terminate_all(
    pool: &PgPool,
    user_id: Uuid,
    keep_session_id: Option<Uuid>,
) -> Result<u64> {
    let mut tx = pool.begin().await.context("begin bulk termination")?;

    let query = r"
        UPDATE sessions
        SET state = 'revoked', revoked_at = NOW()
        WHERE user_id = $1
          AND state = 'active'
          AND ($2::uuid IS NULL OR id <> $2)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .bind(keep_session_id)
        .fetch_all(&mut *tx)
        .instrument(span)
        .await
        .context("failed to terminate sessions")?;

    let revoked: Vec<Uuid> = rows.into_iter().map(|row| row.get("id")).collect();

    if !revoked.is_empty() {
        let query = r"
            UPDATE session_tokens
            SET consumed_at = NOW()
            WHERE session_id = ANY($1) AND consumed_at IS NULL
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&revoked)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to consume live tokens for terminated sessions")?;
    }

    tx.commit().await.context("commit bulk termination")?;

    Ok(revoked.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_standing_debug_includes_flags() {
        let standing = TokenStanding {
            session_id: Uuid::nil(),
            user_id: Uuid::nil(),
            consumed: true,
            session_revoked: false,
            expired: false,
        };
        let rendered = format!("{standing:?}");
        assert!(rendered.contains("consumed: true"));
        assert!(rendered.contains("session_revoked: false"));
    }

    #[test]
    fn session_overview_holds_values() {
        let overview = SessionOverview {
            id: Uuid::nil(),
            device: Some("macOS".to_string()),
            browser: None,
            ip_address: Some("1.2.3.4".to_string()),
            last_activity_unix: 1_700_000_000,
        };
        assert_eq!(overview.id, Uuid::nil());
        assert_eq!(overview.device.as_deref(), Some("macOS"));
        assert_eq!(overview.last_activity_unix, 1_700_000_000);
    }
}

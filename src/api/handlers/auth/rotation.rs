//! Refresh token rotation state machine.
//!
//! A lineage stays `active` while its single live token is rotated; any
//! presentation of a consumed token (or a token of a revoked lineage) revokes
//! the whole lineage. Containment wins over availability: after a reuse event
//! both the attacker and the legitimate holder must re-authenticate.

use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use super::storage;
use super::token::TokenCodec;
use super::utils::{hash_refresh_secret, RequestContext};

/// Why a rotation was denied. `Reuse` carries the lineage that was revoked as
/// a side effect, so callers can audit the event.
#[derive(Debug)]
pub(crate) enum RotationDenial {
    InvalidToken,
    Reuse { session_id: Uuid, user_id: Uuid },
    Unavailable,
}

/// Result of a successful rotation: fresh credentials for the same lineage.
pub(crate) struct RotatedBundle {
    pub(crate) access_token: String,
    pub(crate) refresh_secret: String,
    pub(crate) expires_in: i64,
    pub(crate) session_id: Uuid,
    pub(crate) user_id: Uuid,
}

/// Validate a presented refresh secret and rotate its lineage.
///
/// Consuming the old entry, inserting the new one, and moving the session
/// pointer commit as one transaction; two concurrent calls with the same
/// secret yield exactly one success. A failed conditional consume is never
/// retried blindly — the hash is reclassified from scratch, because by then
/// it may be a reuse case.
pub(crate) async fn rotate(
    pool: &PgPool,
    codec: &TokenCodec,
    presented_secret: &str,
    context: &RequestContext,
) -> Result<RotatedBundle, RotationDenial> {
    let presented_hash = hash_refresh_secret(presented_secret);

    let replacement = codec.issue_refresh_secret().map_err(|err| {
        error!("Failed to issue refresh secret: {err}");
        RotationDenial::Unavailable
    })?;

    let mut tx = pool.begin().await.map_err(|err| {
        error!("Failed to begin rotation transaction: {err}");
        RotationDenial::Unavailable
    })?;

    let consumed = storage::consume_live_token(&mut tx, &presented_hash, &replacement.hash)
        .await
        .map_err(|err| {
            error!("Rotation consume failed: {err}");
            RotationDenial::Unavailable
        })?;

    let Some(consumed) = consumed else {
        // Loser of a race, stale token, or unknown hash; the transaction holds
        // no changes, so let it go and look the hash up fresh.
        let _ = tx.rollback().await;
        return Err(deny_stale_token(pool, &presented_hash).await);
    };

    storage::attach_rotated_token(&mut tx, consumed.session_id, &replacement.hash, context)
        .await
        .map_err(|err| {
            error!("Rotation attach failed: {err}");
            RotationDenial::Unavailable
        })?;

    let (access_token, expires_in) = codec
        .issue_access_token(consumed.user_id, consumed.session_id)
        .map_err(|err| {
            error!("Failed to issue access token during rotation: {err}");
            RotationDenial::Unavailable
        })?;

    tx.commit().await.map_err(|err| {
        error!("Failed to commit rotation: {err}");
        RotationDenial::Unavailable
    })?;

    Ok(RotatedBundle {
        access_token,
        refresh_secret: replacement.secret,
        expires_in,
        session_id: consumed.session_id,
        user_id: consumed.user_id,
    })
}

/// Classify a hash that failed the conditional consume and pick the denial.
async fn deny_stale_token(pool: &PgPool, presented_hash: &[u8]) -> RotationDenial {
    let standing = match storage::classify_token(pool, presented_hash).await {
        Ok(standing) => standing,
        Err(err) => {
            error!("Failed to classify refresh token: {err}");
            return RotationDenial::Unavailable;
        }
    };

    let Some(standing) = standing else {
        return RotationDenial::InvalidToken;
    };

    if standing.consumed || standing.session_revoked {
        // Reuse of a spent token, or activity against a dead lineage: revoke
        // everything so neither the attacker nor the holder can continue.
        if let Err(err) = storage::revoke_lineage(pool, standing.session_id).await {
            error!("Failed to revoke lineage after reuse: {err}");
            return RotationDenial::Unavailable;
        }
        return RotationDenial::Reuse {
            session_id: standing.session_id,
            user_id: standing.user_id,
        };
    }

    if standing.expired {
        return RotationDenial::InvalidToken;
    }

    // Live, active, unexpired — yet the conditional update matched nothing.
    // Fail closed rather than guessing what changed in between.
    debug!(
        session_id = %standing.session_id,
        "Live token failed conditional consume; denying"
    );
    RotationDenial::InvalidToken
}

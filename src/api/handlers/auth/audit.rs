//! Best-effort audit trail for auth events.
//!
//! Recording is fire-and-forget: the insert runs on a spawned task and a
//! failure is logged, never surfaced to the request that produced the event.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{warn, Instrument};
use uuid::Uuid;

#[derive(Clone, Copy, Debug)]
pub(super) enum AuditAction {
    Login,
    RefreshRejected,
    RefreshReused,
    SessionTerminated,
    SessionsTerminatedAll,
}

impl AuditAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::RefreshRejected => "refresh_rejected",
            Self::RefreshReused => "refresh_reused",
            Self::SessionTerminated => "session_terminated",
            Self::SessionsTerminatedAll => "sessions_terminated_all",
        }
    }
}

/// One audit event: fixed identity columns plus an opaque extension map for
/// anything event-specific. Free-form dictionaries stop here; the storage row
/// has an explicit shape.
#[derive(Debug)]
pub(super) struct AuditEvent {
    action: AuditAction,
    user_id: Option<Uuid>,
    session_id: Option<Uuid>,
    ip_address: Option<String>,
    detail: serde_json::Map<String, Value>,
}

impl AuditEvent {
    pub(super) fn new(action: AuditAction) -> Self {
        Self {
            action,
            user_id: None,
            session_id: None,
            ip_address: None,
            detail: serde_json::Map::new(),
        }
    }

    pub(super) fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub(super) fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub(super) fn with_ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub(super) fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.detail.insert(key.to_string(), value);
        self
    }
}

/// Queue an event for recording without blocking the caller.
pub(super) fn record(pool: &PgPool, event: AuditEvent) {
    let pool = pool.clone();
    tokio::spawn(async move {
        if let Err(err) = insert_event(&pool, &event).await {
            warn!("Failed to record audit event {:?}: {err}", event.action);
        }
    });
}

async fn insert_event(pool: &PgPool, event: &AuditEvent) -> Result<()> {
    let query = r"
        INSERT INTO auth_audit_log (user_id, session_id, event, ip_address, detail)
        VALUES ($1, $2, $3, $4, $5::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let detail =
        serde_json::to_string(&event.detail).context("failed to serialize audit detail")?;
    sqlx::query(query)
        .bind(event.user_id)
        .bind(event.session_id)
        .bind(event.action.as_str())
        .bind(event.ip_address.as_deref())
        .bind(detail)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert audit event")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audit_action_names() {
        assert_eq!(AuditAction::Login.as_str(), "login");
        assert_eq!(AuditAction::RefreshReused.as_str(), "refresh_reused");
        assert_eq!(
            AuditAction::SessionsTerminatedAll.as_str(),
            "sessions_terminated_all"
        );
    }

    #[test]
    fn audit_event_builder_collects_fields() {
        let user_id = Uuid::new_v4();
        let event = AuditEvent::new(AuditAction::SessionTerminated)
            .with_user(user_id)
            .with_ip(Some("1.2.3.4".to_string()))
            .with_detail("count", json!(3));

        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.session_id, None);
        assert_eq!(event.ip_address.as_deref(), Some("1.2.3.4"));
        assert_eq!(event.detail.get("count"), Some(&json!(3)));
    }
}

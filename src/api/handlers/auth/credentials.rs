//! Credential verification boundary.
//!
//! Password policy, registration, and resets live outside this service; the
//! only contract here is "does this email/password pair belong to an active
//! user". Unknown emails still pay for one Argon2 verification so response
//! timing does not reveal which accounts exist.

use anyhow::{Context, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use once_cell::sync::Lazy;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// The user a successful login is issued for.
pub(super) struct VerifiedUser {
    pub(super) id: Uuid,
    pub(super) email: String,
}

// Hash of a throwaway password, verified against when the account is missing
// so both branches cost one Argon2 run.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    hash_password("sesio-dummy-password").unwrap_or_else(|_| {
        "$argon2id$v=19$m=19456,t=2,p=1$c2VzaW8tZHVtbXk$\
         F2jZQeYfXkyGXSY5KF1nTTJ8V9F4AY0hXxEo0d3t2W8"
            .to_string()
    })
});

/// Hash a password for storage. Used by provisioning and test fixtures; the
/// service itself never writes `users` rows.
///
/// # Errors
/// Returns an error if Argon2 hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify an email/password pair against the active user record.
///
/// Returns `Ok(None)` for unknown emails, inactive users, and wrong
/// passwords alike; only infrastructure failures are errors.
pub(super) async fn verify_credentials(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<Option<VerifiedUser>> {
    let query = r"
        SELECT id, email, password_hash
        FROM users
        WHERE email = $1 AND status = 'active'
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user for login")?;

    let Some(row) = row else {
        let _ = verify_against(&DUMMY_HASH, password);
        return Ok(None);
    };

    let stored: String = row.get("password_hash");
    if verify_against(&stored, password) {
        Ok(Some(VerifiedUser {
            id: row.get("id"),
            email: row.get("email"),
        }))
    } else {
        Ok(None)
    }
}

fn verify_against(stored_hash: &str, password: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("CorrectHorseBatteryStaple");
        assert!(hash.is_ok());
        if let Ok(hash) = hash {
            assert!(verify_against(&hash, "CorrectHorseBatteryStaple"));
            assert!(!verify_against(&hash, "wrong-password"));
        }
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("password").ok();
        let second = hash_password("password").ok();
        assert!(first.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn verify_against_rejects_malformed_hash() {
        assert!(!verify_against("not-a-phc-string", "password"));
    }

    #[test]
    fn dummy_hash_parses() {
        assert!(PasswordHash::new(&DUMMY_HASH).is_ok());
    }
}

//! Access token signing/verification and refresh secret issuance.
//!
//! Access tokens are short-lived HS256 JWTs that verify without a store
//! lookup. Refresh secrets are opaque 256-bit random values; the codec hands
//! back the raw value exactly once together with the hash the store keeps.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use super::state::AuthConfig;
use super::utils::{generate_refresh_secret, hash_refresh_secret};

/// Claims carried by an access token.
///
/// `sid` is the session lineage id, so session-management endpoints can tell
/// which listed session belongs to the caller without a token table lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub sid: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    pub(crate) fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub(crate) fn session_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sid).ok()
    }
}

/// Why an access token was rejected. Expiry is an expected signal, not a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessTokenError {
    Expired,
    Invalid,
}

/// A freshly minted refresh secret and the hash the store keeps for it.
pub struct IssuedRefreshSecret {
    pub secret: String,
    pub hash: Vec<u8>,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    remember_me_ttl_seconds: i64,
}

impl TokenCodec {
    #[must_use]
    pub(crate) fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret().expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl_seconds: config.access_ttl_seconds(),
            refresh_ttl_seconds: config.refresh_ttl_seconds(),
            remember_me_ttl_seconds: config.remember_me_ttl_seconds(),
        }
    }

    /// Sign a new access token for the user/session pair.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn issue_access_token(&self, user_id: Uuid, session_id: Uuid) -> Result<(String, i64)> {
        let now = unix_now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.access_ttl_seconds,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .context("failed to sign access token")?;
        Ok((token, self.access_ttl_seconds))
    }

    /// Verify signature and expiry; no store lookup involved.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AccessTokenError> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AccessTokenError::Expired,
                _ => AccessTokenError::Invalid,
            })
    }

    /// Mint a refresh secret; the raw value goes to the client, the hash to the store.
    ///
    /// # Errors
    /// Returns an error if the system RNG fails.
    pub fn issue_refresh_secret(&self) -> Result<IssuedRefreshSecret> {
        let secret = generate_refresh_secret()?;
        let hash = hash_refresh_secret(&secret);
        Ok(IssuedRefreshSecret { secret, hash })
    }

    /// Absolute refresh lifetime, fixed at login and never extended by rotation.
    #[must_use]
    pub fn refresh_lifetime_seconds(&self, remember_me: bool) -> i64 {
        if remember_me {
            self.remember_me_ttl_seconds
        } else {
            self.refresh_ttl_seconds
        }
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(0))
}

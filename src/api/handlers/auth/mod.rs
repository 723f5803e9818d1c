//! Auth handlers and supporting modules.
//!
//! This module implements the rotating refresh token scheme: every login
//! opens a session lineage with a stable id, every refresh atomically swaps
//! the lineage's single live token for a fresh one, and presenting a spent
//! token revokes the whole lineage.
//!
//! ## Token shapes
//!
//! - **Access tokens** are short-lived HS256 JWTs verified offline; the `sid`
//!   claim ties a bearer to its lineage.
//! - **Refresh tokens** are opaque 256-bit random secrets. The database only
//!   ever sees their SHA-256 hash.
//!
//! ## Concurrency
//!
//! There is no in-process session state; the conditional update in
//! [`storage::consume_live_token`] is the only serialization point, so the
//! scheme holds across any number of service instances.

mod audit;
pub(crate) mod credentials;
pub(crate) mod login;
pub(crate) mod principal;
mod rate_limit;
pub(crate) mod refresh;
mod rotation;
pub(crate) mod sessions;
mod state;
mod storage;
mod token;
pub(crate) mod types;
mod utils;

pub use credentials::hash_password;
pub use principal::Principal;
pub use rate_limit::{NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter};
pub use state::{AuthConfig, AuthState};
pub use token::{AccessTokenError, TokenCodec};
pub use utils::RequestContext;

//! # Sesio (Session & Refresh Token Authority)
//!
//! `sesio` issues and rotates the credentials a first-party backend hands to
//! its own clients: short-lived signed access tokens plus opaque single-use
//! refresh tokens.
//!
//! ## Lineages and rotation
//!
//! Every login opens a **session lineage** with a stable id. Each refresh
//! atomically swaps the lineage's single live token for a fresh one, keeping
//! an append-only history of every secret ever issued. Because spent tokens
//! stay on record, presenting one again is unambiguous evidence of theft (or
//! a lost race) and revokes the whole lineage on the spot.
//!
//! ## Session management
//!
//! Users can enumerate their active sessions with device metadata, terminate
//! one, or terminate all (optionally keeping the session that made the
//! request). Termination operates on lineage ids, so it survives rotations.
//!
//! ## Deployment shape
//!
//! All coordination goes through Postgres row updates; instances share no
//! other state, so any number of replicas can serve the same user base.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

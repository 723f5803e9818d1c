//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .cloned()
        .context("missing required argument: --jwt-secret")?;
    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .context("missing required argument: --frontend-base-url")?;
    let access_ttl_seconds = matches
        .get_one::<i64>("access-ttl-seconds")
        .copied()
        .unwrap_or(900);
    let refresh_ttl_seconds = matches
        .get_one::<i64>("refresh-ttl-seconds")
        .copied()
        .unwrap_or(604_800);
    let remember_me_ttl_seconds = matches
        .get_one::<i64>("refresh-ttl-remember-seconds")
        .copied()
        .unwrap_or(2_592_000);

    Ok(Action::Server(Box::new(Args {
        port,
        dsn,
        jwt_secret: SecretString::from(jwt_secret),
        frontend_base_url,
        access_ttl_seconds,
        refresh_ttl_seconds,
        remember_me_ttl_seconds,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars(
            [
                ("SESIO_DSN", None::<&str>),
                ("SESIO_JWT_SECRET", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.try_get_matches_from(vec![
                    "sesio",
                    "--dsn",
                    "postgres://user@localhost:5432/sesio",
                    "--jwt-secret",
                    "test-secret",
                    "--refresh-ttl-seconds",
                    "3600",
                ]);
                assert!(matches.is_ok());
                if let Ok(matches) = matches {
                    let action = handler(&matches);
                    assert!(action.is_ok());
                    if let Ok(Action::Server(args)) = action {
                        assert_eq!(args.port, 8080);
                        assert_eq!(args.dsn, "postgres://user@localhost:5432/sesio");
                        assert_eq!(args.refresh_ttl_seconds, 3600);
                        assert_eq!(args.remember_me_ttl_seconds, 2_592_000);
                    }
                }
            },
        );
    }
}

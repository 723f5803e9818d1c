//! Full-binary integration test.
//!
//! Spawns the compiled `sesio` binary against a disposable Postgres and
//! drives the HTTP surface with a real client: health, login, rotation,
//! reuse containment, and session management.

mod support;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::{
    net::TcpListener,
    process::{Child, Command, Stdio},
    time::Duration,
};
use support::{seed_user, TestDb};
use tokio::time::sleep;

const PASSWORD: &str = "CorrectHorseBatteryStaple";

struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

async fn wait_for_health(client: &reqwest::Client, base: &str) -> Result<()> {
    for _ in 0..40 {
        if let Ok(response) = client.get(format!("{base}/health")).send().await {
            if response.status() == StatusCode::OK {
                return Ok(());
            }
        }
        sleep(Duration::from_millis(500)).await;
    }
    bail!("server never became healthy at {base}")
}

#[tokio::test]
async fn server_serves_full_session_lifecycle() -> Result<()> {
    let Some(db) = TestDb::start().await? else {
        return Ok(());
    };
    seed_user(&db.pool, "alice@example.com", PASSWORD).await?;

    let port = free_port()?;
    let child = Command::new(env!("CARGO_BIN_EXE_sesio"))
        .env("SESIO_PORT", port.to_string())
        .env("SESIO_DSN", &db.dsn)
        .env("SESIO_JWT_SECRET", "integration-server-secret")
        .env("SESIO_FRONTEND_BASE_URL", "http://localhost:5173")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to spawn sesio binary")?;
    let _guard = ChildGuard(child);

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}");
    wait_for_health(&client, &base).await?;

    // Login opens a lineage and returns the full bundle.
    let response = client
        .post(format!("{base}/auth/login"))
        .json(&json!({
            "email": "alice@example.com",
            "password": PASSWORD,
            "rememberMe": true,
        }))
        .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64) Firefox/127.0")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let issued: Value = response.json().await?;
    let access_token = issued["access_token"]
        .as_str()
        .context("missing access_token")?
        .to_string();
    let refresh_token = issued["refresh_token"]
        .as_str()
        .context("missing refresh_token")?
        .to_string();
    assert_eq!(issued["user"]["email"], json!("alice@example.com"));
    assert!(issued["expires_in"].as_i64().unwrap_or(0) > 0);

    // Rotate once, then demonstrate reuse containment.
    let response = client
        .post(format!("{base}/auth/refresh"))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated: Value = response.json().await?;
    let new_refresh = rotated["refresh_token"]
        .as_str()
        .context("missing rotated refresh_token")?
        .to_string();
    assert_ne!(new_refresh, refresh_token);

    let response = client
        .post(format!("{base}/auth/refresh"))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{base}/auth/refresh"))
        .json(&json!({ "refresh_token": new_refresh }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The access token stays valid for the session list; the revoked lineage
    // no longer shows up.
    let response = client
        .get(format!("{base}/auth/sessions"))
        .bearer_auth(&access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Value = response.json().await?;
    let entries = listed["sessions"]
        .as_array()
        .context("missing sessions array")?;
    assert!(entries.is_empty());

    // A fresh login starts over; device metadata is captured for the list.
    let response = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": PASSWORD }))
        .header(
            "user-agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        )
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let issued: Value = response.json().await?;
    let access_token = issued["access_token"]
        .as_str()
        .context("missing access_token")?
        .to_string();

    let response = client
        .get(format!("{base}/auth/sessions"))
        .bearer_auth(&access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Value = response.json().await?;
    let entries = listed["sessions"]
        .as_array()
        .context("missing sessions array")?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["current"], json!(true));
    assert_eq!(entries[0]["device"], json!("macOS"));
    assert_eq!(entries[0]["browser"], json!("Chrome"));

    // Bulk termination without keepCurrent sweeps everything.
    let response = client
        .delete(format!("{base}/auth/sessions/all"))
        .bearer_auth(&access_token)
        .json(&json!({ "keepCurrent": false }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["message"], json!("All sessions terminated"));

    Ok(())
}

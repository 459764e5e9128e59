#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use edge_playground::auth::{Claims, JwtKeys};
use reqwest::StatusCode;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-at-least-32-chars";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    /// Spawn the server binary on a free port with a memory store and the test secret.
    /// `extra_env` is applied last and can override any of the defaults.
    pub fn spawn(extra_env: &[(&str, &str)]) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_edge-playground"));
        cmd.env("PLAYGROUND_PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("APP_ENV", "development")
            .env("STORE_BACKEND", "memory")
            .env("JWT_SECRET", TEST_JWT_SECRET)
            .env("STORAGE_URL", "")
            .env("CORS_ALLOW_ORIGINS", "*")
            .env("CORS_ALLOW_CREDENTIALS", "false")
            .env_remove("JWT_AUDIENCE")
            .env_remove("STORE_FIXTURE")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in extra_env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Shared server for one test binary. Tests run concurrently against it, so each test
/// should create the records it asserts on.
pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn(&[]).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

pub fn token(sub: &str, email: Option<&str>, role: &str) -> String {
    let keys = JwtKeys::new(TEST_JWT_SECRET, None).expect("test keys");
    keys.sign(&Claims::new(Some(sub.to_string()), email.map(str::to_string), role, 1))
        .expect("sign test token")
}

pub fn user_token() -> String {
    token("00000000-0000-0000-0000-0000000000aa", Some("tester@example.com"), "authenticated")
}

/// Value unique to this test process, for records that must not collide with other tests.
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

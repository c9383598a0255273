#![allow(dead_code)]

use axum::{Json, Router, routing::post};
use serde_json::{Value, json};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::sync::oneshot;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A `botdeck serve` process with its own data directory.
pub struct ServerHarness {
    child: Child,
    pub api_port: u16,
    pub api_base: String,
    data_dir: tempfile::TempDir,
    client: reqwest::Client,
}

impl ServerHarness {
    pub async fn spawn(gateway_url: &str) -> TestResult<Self> {
        Self::spawn_with_config(gateway_url, "").await
    }

    /// `config_toml` is written to `botdeck.toml` before the server starts.
    pub async fn spawn_with_config(gateway_url: &str, config_toml: &str) -> TestResult<Self> {
        let api_port = find_free_port()?;
        let data_dir = tempfile::tempdir()?;
        if !config_toml.is_empty() {
            std::fs::write(data_dir.path().join("botdeck.toml"), config_toml)?;
        }
        let log_file = std::fs::File::create(data_dir.path().join("server.log"))?;
        let log_file_err = log_file.try_clone()?;

        let child = Command::new(botdeck_binary_path()?)
            .arg("serve")
            .arg("--api-host")
            .arg("127.0.0.1")
            .arg("--api-port")
            .arg(api_port.to_string())
            .env("BOTDECK_DATA_DIR", data_dir.path())
            .env("BOTDECK_GATEWAY_URL", gateway_url)
            .env("RUST_LOG", "info")
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_err))
            .spawn()?;

        let mut harness = Self {
            child,
            api_port,
            api_base: format!("http://127.0.0.1:{}", api_port),
            data_dir,
            client: reqwest::Client::new(),
        };

        harness.wait_until_ready().await?;
        Ok(harness)
    }

    pub fn data_dir(&self) -> &Path {
        self.data_dir.path()
    }

    async fn wait_until_ready(&mut self) -> TestResult<()> {
        for _ in 0..80 {
            if let Some(status) = self.child.try_wait()? {
                return Err(format!("botdeck exited early with status: {}", status).into());
            }

            let res = self
                .client
                .get(format!("{}/api/heartbeat", self.api_base))
                .timeout(Duration::from_millis(700))
                .send()
                .await;
            if let Ok(resp) = res
                && resp.status().is_success()
            {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        Err("Timed out waiting for botdeck API readiness".into())
    }

    pub async fn request_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> TestResult<(u16, Value)> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .timeout(Duration::from_secs(10));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let json = resp.json::<Value>().await.unwrap_or(json!({}));
        Ok((status, json))
    }
}

impl Drop for ServerHarness {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Stand-in for the gateway's `/tools/invoke` endpoint.
pub struct MockGateway {
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockGateway {
    /// Reports one enabled job and `sessions` active sessions.
    pub async fn start(sessions: usize) -> TestResult<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let app = Router::new().route(
            "/tools/invoke",
            post(move |Json(body): Json<Value>| async move {
                match body["tool"].as_str() {
                    Some("cron") => Json(json!({
                        "ok": true,
                        "result": { "details": { "jobs": [{
                            "id": "job-morning",
                            "name": "Morning briefing",
                            "enabled": true,
                            "schedule": { "kind": "cron", "expr": "0 7 * * *" },
                            "payload": { "text": "Brief me" }
                        }] } }
                    })),
                    Some("sessions_list") => {
                        let list: Vec<Value> = (0..sessions)
                            .map(|i| json!({ "key": format!("agent:main:{}", i) }))
                            .collect();
                        Json(json!({ "ok": true, "result": { "sessions": list } }))
                    }
                    _ => Json(json!({ "ok": false, "error": { "message": "unknown tool" } })),
                }
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub fn find_free_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Nothing listens here; gateway calls fail fast.
pub fn unreachable_gateway() -> TestResult<String> {
    Ok(format!("http://127.0.0.1:{}", find_free_port()?))
}

fn botdeck_binary_path() -> TestResult<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_botdeck") {
        return Ok(PathBuf::from(path));
    }

    let candidate = PathBuf::from("target")
        .join("debug")
        .join(if cfg!(windows) { "botdeck.exe" } else { "botdeck" });
    if candidate.exists() {
        return Ok(candidate);
    }

    Err("Could not locate botdeck test binary path".into())
}

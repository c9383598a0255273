mod handlers;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info};

use crate::core::lifecycle::LifecycleComponent;
use crate::core::store::DashboardStore;
use crate::core::sync::SyncService;

pub use router::build_api_router;

pub struct ApiServer {
    state: AppState,
    api_host: String,
    serve_task: Option<JoinHandle<()>>,
}

pub struct ApiServerConfig {
    pub store: Arc<DashboardStore>,
    pub sync: Arc<SyncService>,
    pub log_tx: broadcast::Sender<String>,
    pub api_host: String,
    pub api_port: u16,
}

#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Arc<DashboardStore>,
    pub(crate) sync: Arc<SyncService>,
    pub(crate) log_tx: broadcast::Sender<String>,
    pub(crate) api_port: u16,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            state: AppState {
                store: config.store,
                sync: config.sync,
                log_tx: config.log_tx,
                api_port: config.api_port,
            },
            api_host: config.api_host,
            serve_task: None,
        }
    }
}

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(line) => Ok(Event::default().data(line)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.api_host, self.state.api_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        let app = build_api_router(self.state.clone());

        info!("API Server listening on http://{addr}");
        self.serve_task = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("API Server stopped: {}", e);
            }
        }));
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
        Ok(())
    }
}

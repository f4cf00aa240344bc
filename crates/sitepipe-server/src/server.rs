//! Development server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use sitepipe_build::styles::MAIN_CSS;
use sitepipe_build::{BuildConfig, Pipeline, TaskKind, LIVE_RELOAD_SCRIPT};

use crate::livereload::{
    live_reload_client_script, next_message, LiveReloadHub, ReloadMessage, LIVE_RELOAD_SOCKET,
};
use crate::watcher::{FileWatcher, WatchEvent};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Build settings used for rebuilds; the output folder is served
    pub build: BuildConfig,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Shared server state.
struct ServerState {
    pipeline: Pipeline,
    hub: LiveReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Serve the build folder and rebuild on source changes until the
    /// process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|_| ServerError::InvalidAddress(addr_str.clone()))?;

        let output_dir = self.config.build.output_dir.clone();
        let source_dir = self.config.build.source_dir.clone();

        let state = Arc::new(ServerState {
            pipeline: Pipeline::new(self.config.build.clone()),
            hub: LiveReloadHub::new(),
        });

        let (watcher, mut rx) =
            FileWatcher::new(&source_dir).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let watch_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&watch_state, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(state, &output_dir);

        tracing::info!("Serving {} at http://{}", output_dir.display(), addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        if self.config.open {
            let url = format!("http://{}", addr);
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

fn router(state: Arc<ServerState>, output_dir: &std::path::Path) -> Router {
    Router::new()
        .route(LIVE_RELOAD_SOCKET, get(ws_handler))
        .route(LIVE_RELOAD_SCRIPT, get(client_script_handler))
        .fallback_service(ServeDir::new(output_dir))
        .with_state(state)
}

/// Rerun the task a change belongs to and notify browsers.
async fn handle_watch_event(state: &Arc<ServerState>, event: WatchEvent) {
    tracing::info!("Changed: {} ({})", event.path.display(), event.task);

    let task_state = Arc::clone(state);
    let task = event.task;
    let result = tokio::task::spawn_blocking(move || task_state.pipeline.run_task(task)).await;

    match result {
        Ok(Ok(_)) => state.hub.send(reload_message(task)),
        Ok(Err(e)) => tracing::warn!("Rebuild of {} failed: {}", task, e),
        Err(e) => tracing::warn!("Rebuild of {} panicked: {}", task, e),
    }
}

/// Stylesheets are swapped in place, everything else reloads the page.
fn reload_message(task: TaskKind) -> ReloadMessage {
    match task {
        TaskKind::Styles => ReloadMessage::Css {
            path: format!("/css/{}", MAIN_CSS),
        },
        _ => ReloadMessage::Reload,
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one browser until it disconnects.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_json(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Some(msg) = next_message(&mut rx).await {
        if send_json(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_json(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to encode reload message: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

async fn client_script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        live_reload_client_script(),
    )
}

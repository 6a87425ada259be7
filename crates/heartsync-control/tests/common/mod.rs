//! In-process stand-in for the metrics service

#![allow(dead_code)]

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// What the websocket route should push next
#[derive(Debug, Clone)]
pub enum WsCommand {
    Frame(String),
    Binary(Vec<u8>),
    /// Close the connection from the server side
    Drop,
}

/// Reply of the metrics route
#[derive(Debug, Clone)]
pub enum MetricsReply {
    Missing,
    Error,
    Body(String),
}

#[derive(Clone)]
struct ServiceState {
    frames: broadcast::Sender<WsCommand>,
    ws_connections: Arc<AtomicUsize>,
    metrics: Arc<Mutex<MetricsReply>>,
    metrics_delay: Arc<Mutex<Duration>>,
    metrics_fetches: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<String>>>,
    command_status: Arc<Mutex<StatusCode>>,
    command_delay: Arc<Mutex<Duration>>,
}

pub struct TestService {
    pub addr: SocketAddr,
    state: ServiceState,
}

impl TestService {
    /// Bind an ephemeral port and serve on the current runtime.
    pub async fn start() -> Self {
        let (frames, _) = broadcast::channel(64);
        let state = ServiceState {
            frames,
            ws_connections: Arc::new(AtomicUsize::new(0)),
            metrics: Arc::new(Mutex::new(MetricsReply::Missing)),
            metrics_delay: Arc::new(Mutex::new(Duration::ZERO)),
            metrics_fetches: Arc::new(AtomicUsize::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
            command_status: Arc::new(Mutex::new(StatusCode::OK)),
            command_delay: Arc::new(Mutex::new(Duration::ZERO)),
        };

        let app = Router::new()
            .route("/ws", get(ws_route))
            .route("/metrics", get(metrics_route))
            .route("/set_intensity/:value", post(command_route))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test service");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn metrics_url(&self) -> String {
        format!("http://{}/metrics", self.addr)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn send_frame(&self, text: &str) {
        let _ = self.state.frames.send(WsCommand::Frame(text.to_string()));
    }

    pub fn send_binary(&self, data: Vec<u8>) {
        let _ = self.state.frames.send(WsCommand::Binary(data));
    }

    pub fn drop_connections(&self) {
        let _ = self.state.frames.send(WsCommand::Drop);
    }

    pub fn ws_connections(&self) -> usize {
        self.state.ws_connections.load(Ordering::SeqCst)
    }

    pub fn set_metrics(&self, reply: MetricsReply) {
        *self.state.metrics.lock() = reply;
    }

    pub fn set_metrics_delay(&self, delay: Duration) {
        *self.state.metrics_delay.lock() = delay;
    }

    pub fn metrics_fetches(&self) -> usize {
        self.state.metrics_fetches.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().clone()
    }

    pub fn set_command_status(&self, status: StatusCode) {
        *self.state.command_status.lock() = status;
    }

    pub fn set_command_delay(&self, delay: Duration) {
        *self.state.command_delay.lock() = delay;
    }
}

async fn ws_route(ws: WebSocketUpgrade, State(state): State<ServiceState>) -> Response {
    ws.on_upgrade(move |socket| push_frames(socket, state))
}

async fn push_frames(mut socket: WebSocket, state: ServiceState) {
    // Subscribe before announcing the connection so no frame is missed
    let mut rx = state.frames.subscribe();
    state.ws_connections.fetch_add(1, Ordering::SeqCst);

    while let Ok(cmd) = rx.recv().await {
        let sent = match cmd {
            WsCommand::Frame(text) => socket.send(Message::Text(text)).await,
            WsCommand::Binary(data) => socket.send(Message::Binary(data)).await,
            WsCommand::Drop => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        };
        if sent.is_err() {
            break;
        }
    }
}

async fn metrics_route(State(state): State<ServiceState>) -> Response {
    state.metrics_fetches.fetch_add(1, Ordering::SeqCst);
    let delay = *state.metrics_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let reply = state.metrics.lock().clone();
    match reply {
        MetricsReply::Missing => (StatusCode::NOT_FOUND, "No heart data found").into_response(),
        MetricsReply::Error => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        MetricsReply::Body(body) => (StatusCode::OK, body).into_response(),
    }
}

async fn command_route(Path(value): Path<String>, State(state): State<ServiceState>) -> StatusCode {
    state.commands.lock().push(value);
    let delay = *state.command_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let status = *state.command_status.lock();
    status
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Blocking variant for tests driving the synchronous client.
pub fn wait_until_blocking(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub fn snapshot_json(bpm: f32, zone: &str, color: &str) -> String {
    serde_json::json!({
        "bpm": bpm,
        "trimp": 1.5,
        "hrr": 0.0,
        "zone": zone,
        "color": color,
    })
    .to_string()
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use neon_harvest::best_score::BestScoreStore;
use neon_harvest::constants::TICK_MS;
use neon_harvest::driver::{spawn_session_driver, DriverCommand, DriverEvent};
use neon_harvest::engine::GameSession;
use neon_harvest::rng::EntropyRandom;
use neon_harvest::server_protocol::{parse_client_message, ParsedClientMessage, ServerMessage};
use neon_harvest::types::SessionConfig;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, Parser)]
#[command(name = "server", about = "Websocket host for neon harvest sessions")]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, env = "BEST_SCORE_PATH", default_value = ".data/best-score.json")]
    best_score_path: PathBuf,
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<BestScoreStore>>,
    config: SessionConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    WaitForRoom,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = SessionConfig::default();
    config.validate().context("default session config is invalid")?;
    let state = AppState {
        store: Arc::new(Mutex::new(BestScoreStore::new(args.best_score_path.clone()))),
        config,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/best-score", get(best_score_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(args.static_dir) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; serving api and websocket only");
        app
    };

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(port = args.port, store = %args.best_score_path.display(), "listening");
    axum::serve(listener, app)
        .await
        .context("server runtime failed")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn resolve_static_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.join("index.html").is_file() {
            return Some(path);
        }
        warn!(path = %path.display(), "static dir has no index.html");
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn best_score_handler(State(state): State<AppState>) -> impl IntoResponse {
    let guard = state.store.lock().await;
    Json(guard.build_response())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// One driver per socket. Three tasks cooperate: the socket writer, the
/// forwarder from driver events to outbound text, and this reader loop.
async fn handle_socket(state: AppState, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let session = match GameSession::new(state.config.clone(), EntropyRandom::new()) {
        Ok(session) => session,
        Err(error) => {
            warn!(%error, "rejecting socket: session config invalid");
            let message = ServerMessage::Error {
                message: error.to_string(),
            };
            send_message(&tx, &message, QueuePolicy::WaitForRoom).await;
            drop(tx);
            let _ = writer.await;
            return;
        }
    };
    let driver = spawn_session_driver(
        session,
        state.store.clone(),
        Duration::from_millis(TICK_MS),
    );
    let commands = driver.commands;
    let mut events = driver.events;

    let best_score = state.store.lock().await.best_score();
    send_message(&tx, &ServerMessage::Welcome { best_score }, QueuePolicy::WaitForRoom).await;

    let forward_tx = tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let (message, policy) = match event {
                DriverEvent::State(snapshot) => {
                    (ServerMessage::State { snapshot }, QueuePolicy::DropOnFull)
                }
                DriverEvent::GameOver {
                    summary,
                    best_score,
                } => (
                    ServerMessage::GameOver {
                        summary,
                        best_score,
                    },
                    QueuePolicy::WaitForRoom,
                ),
            };
            if !send_message(&forward_tx, &message, policy).await {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        let raw = match message {
            Message::Text(raw) => raw.to_string(),
            Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    let error = ServerMessage::Error {
                        message: "invalid utf8 message".to_string(),
                    };
                    send_message(&tx, &error, QueuePolicy::DropOnFull).await;
                    continue;
                }
            },
            Message::Close(_) => break,
            _ => continue,
        };

        match parse_client_message(&raw) {
            Some(ParsedClientMessage::Ping { t }) => {
                send_message(&tx, &ServerMessage::Pong { t }, QueuePolicy::DropOnFull).await;
            }
            Some(parsed) => {
                let Some(command) = driver_command(parsed) else {
                    continue;
                };
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            None => {
                let error = ServerMessage::Error {
                    message: "invalid message".to_string(),
                };
                send_message(&tx, &error, QueuePolicy::DropOnFull).await;
            }
        }
    }

    debug!("socket closed");
    let _ = commands.send(DriverCommand::Shutdown).await;
    drop(commands);
    let _ = driver.task.await;
    let _ = forwarder.await;
    drop(tx);
    let _ = writer.await;
}

fn driver_command(message: ParsedClientMessage) -> Option<DriverCommand> {
    match message {
        ParsedClientMessage::Start => Some(DriverCommand::Start),
        ParsedClientMessage::Restart => Some(DriverCommand::Restart),
        ParsedClientMessage::Input { intents } => Some(DriverCommand::Intents(intents)),
        ParsedClientMessage::Ping { .. } => None,
    }
}

/// Returns false once the outbound queue is closed.
async fn send_message(
    tx: &mpsc::Sender<String>,
    message: &ServerMessage,
    policy: QueuePolicy,
) -> bool {
    let Some(payload) = message.to_json() else {
        warn!("failed to serialize outbound message");
        return true;
    };
    match policy {
        QueuePolicy::DropOnFull => match tx.try_send(payload) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        },
        QueuePolicy::WaitForRoom => tx.send(payload).await.is_ok(),
    }
}

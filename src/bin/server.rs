use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rps_arena_server::clock::{Clock, SystemClock};
use rps_arena_server::config::ServerConfig;
use rps_arena_server::error::LobbyError;
use rps_arena_server::game::lobby::Lobby;
use rps_arena_server::game::registry::RoomLike;
use rps_arena_server::game::room::{JoinTicket, Room};
use rps_arena_server::server_protocol::{
    error_message, event_for_viewer, parse_client_message, pong_message, welcome_message,
    ParsedClientMessage,
};
use rps_arena_server::types::RoomEvent;
use rps_arena_server::validation::validate_nickname;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;

type SharedState = Arc<Lobby>;

const OUTBOUND_QUEUE: usize = 256;
const CLOSE_POLICY_VIOLATION: u16 = 1008;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    code: Option<String>,
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let simulation = config.simulation();
    simulation.validate()?;

    let lobby = Arc::new(Lobby::new(
        simulation,
        Arc::new(SystemClock),
        config.max_rooms,
        config.empty_room_grace_ms,
    ));
    let _sweeper = lobby.spawn_sweeper(Duration::from_millis(config.sweep_interval_ms.max(1)));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/rooms", post(create_room_handler))
        .route("/api/rooms/{code}", get(room_handler))
        .route("/api/match", post(match_handler))
        .route("/ws", get(ws_handler))
        .with_state(lobby);

    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.clone()) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.to_string_lossy(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found, serving the API only");
        app
    };

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(port = config.port, capacity = config.capacity, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("could not install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn resolve_static_dir(configured: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("public"), PathBuf::from("dist/client")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz(State(lobby): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "rooms": lobby.registry().len(),
        "players": lobby.registry().total_players(),
    }))
}

fn lobby_error_response(err: LobbyError) -> Response {
    let status = match err {
        LobbyError::InvalidNickname | LobbyError::InvalidRoomCode => StatusCode::BAD_REQUEST,
        LobbyError::RoomNotFound => StatusCode::NOT_FOUND,
        LobbyError::RoomFull => StatusCode::CONFLICT,
        LobbyError::RoomUnavailable => StatusCode::GONE,
        LobbyError::TooManyRooms => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(error_message(&err.to_string()))).into_response()
}

/// Body is optional; missing flags default to a private room without agents.
async fn create_room_handler(State(lobby): State<SharedState>, body: String) -> Response {
    let options = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);
    let flag = |key: &str| options.get(key).and_then(Value::as_bool).unwrap_or(false);
    match lobby.create_room(flag("isPublic"), flag("autoFill")) {
        Ok(room) => (StatusCode::CREATED, Json(room.summary())).into_response(),
        Err(err) => lobby_error_response(err),
    }
}

async fn room_handler(State(lobby): State<SharedState>, Path(code): Path<String>) -> Response {
    match lobby.find_by_code(&code) {
        Ok(room) => Json(room.summary()).into_response(),
        Err(err) => lobby_error_response(err),
    }
}

async fn match_handler(State(lobby): State<SharedState>) -> Response {
    match lobby.find_or_create_public() {
        Ok(room) => Json(room.summary()).into_response(),
        Err(err) => lobby_error_response(err),
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(lobby): State<SharedState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(lobby, socket, query))
}

/// Joins by invite code when one is given, otherwise quick-matches into a
/// public room.
async fn join_room(lobby: &Lobby, query: &WsQuery) -> Result<(Arc<Room>, JoinTicket), LobbyError> {
    let name = query.name.as_deref().unwrap_or_default();
    match query.code.as_deref() {
        Some(code) => lobby.join_by_code(code, name).await,
        None => {
            validate_nickname(name)?;
            let room = lobby.find_or_create_public()?;
            let ticket = room.join(name).await?;
            Ok((room, ticket))
        }
    }
}

async fn handle_socket(lobby: SharedState, socket: WebSocket, query: WsQuery) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE);
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    let (room, ticket) = match join_room(&lobby, &query).await {
        Ok(joined) => joined,
        Err(err) => {
            debug!(reason = %err, "join rejected");
            let _ = tx
                .send(OutboundMessage::Text(error_message(&err.to_string()).to_string()))
                .await;
            let _ = tx
                .send(OutboundMessage::Close {
                    code: CLOSE_POLICY_VIOLATION,
                    reason: err.to_string(),
                })
                .await;
            drop(tx);
            let _ = writer.await;
            return;
        }
    };

    let player_id = ticket.player_id.clone();
    info!(room_id = %room.id(), player_id = %player_id, "client connected");
    let welcome = welcome_message(&ticket, &room.summary());
    let _ = tx.send(OutboundMessage::Text(welcome.to_string())).await;
    let forwarder = tokio::spawn(forward_events(
        room.subscribe(),
        tx.clone(),
        player_id.clone(),
    ));

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&room, &player_id, &tx, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    handle_client_message(&room, &player_id, &tx, text).await;
                } else {
                    send_error(&tx, "invalid utf8 message");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    room.leave(&player_id).await;
    info!(room_id = %room.id(), player_id = %player_id, "client disconnected");
    forwarder.abort();
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(
    room: &Room,
    player_id: &str,
    tx: &mpsc::Sender<OutboundMessage>,
    raw: &str,
) {
    let Some(message) = parse_client_message(raw) else {
        send_error(tx, "invalid message");
        return;
    };

    match message {
        ParsedClientMessage::Move { x, y, t } => {
            room.set_movement_target(player_id, x, y, t).await;
        }
        ParsedClientMessage::Dash => {
            room.request_dash(player_id).await;
        }
        ParsedClientMessage::Ping { t } => {
            let pong = pong_message(t, SystemClock.now_ms());
            let _ = tx.try_send(OutboundMessage::Text(pong.to_string()));
        }
    }
}

/// Relays room events to one client. Full queues drop the event rather than
/// stalling the room; lagging receivers skip ahead.
async fn forward_events(
    mut events: broadcast::Receiver<RoomEvent>,
    tx: mpsc::Sender<OutboundMessage>,
    player_id: String,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!(player_id = %player_id, skipped, "client lagging behind room events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let Some(event) = event_for_viewer(&event, &player_id) else {
            continue;
        };
        let Ok(payload) = serde_json::to_string(&event) else {
            continue;
        };
        match tx.try_send(OutboundMessage::Text(payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!(player_id = %player_id, "outbound queue full"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

fn send_error(tx: &mpsc::Sender<OutboundMessage>, message: &str) {
    let _ = tx.try_send(OutboundMessage::Text(error_message(message).to_string()));
}

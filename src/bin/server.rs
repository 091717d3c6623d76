use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use coin_collector_rust_server::constants::TICK_MS;
use coin_collector_rust_server::engine::{GameEngine, GameEngineOptions};
use coin_collector_rust_server::server_protocol::{parse_client_message, ParsedClientMessage};
use coin_collector_rust_server::server_utils::{
    normalize_ai_count, normalize_time_limit_ms, player_order_key, sanitize_name,
};
use coin_collector_rust_server::types::{Level, SessionSummary, StartPlayer};
use futures_util::{SinkExt, StreamExt};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone, Debug)]
struct LobbyPlayerInternal {
    id: String,
    name: String,
    connected: bool,
    ai: bool,
    reconnect_token: String,
}

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    player_id: Option<String>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    lobby_players: HashMap<String, LobbyPlayerInternal>,
    active_client_by_player_id: HashMap<String, String>,
    host_id: Option<String>,
    game: Option<GameEngine>,
    running_ai_count: usize,
    last_summary: Option<SessionSummary>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            clients: HashMap::new(),
            lobby_players: HashMap::new(),
            active_client_by_player_id: HashMap::new(),
            host_id: None,
            game: None,
            running_ai_count: 0,
            last_summary: None,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let state = Arc::new(Mutex::new(ServerState::new()));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/session", get(session_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; serving the websocket api only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(port, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [
        PathBuf::from("dist/client"),
        PathBuf::from("../../dist/client"),
    ];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn session_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let mut guard = state.lock().await;
    let running = guard.game.is_some();
    let snapshot = guard.game.as_mut().map(|game| game.build_snapshot(false));
    let config = guard.game.as_ref().map(|game| game.config.clone());
    Json(json!({
        "running": running,
        "config": config,
        "snapshot": snapshot,
        "lastSummary": guard.last_summary,
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                player_id: None,
            },
        );
    }
    debug!(client_id = %client_id, "client connected");

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

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    match message {
        ParsedClientMessage::Hello {
            name,
            reconnect_token,
        } => {
            handle_hello(state, client_id, name, reconnect_token).await;
        }
        ParsedClientMessage::Ping { t } => {
            let mut guard = state.lock().await;
            send_to_client(
                &mut guard,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
        ParsedClientMessage::LobbyStart {
            level,
            ai_player_count,
            time_limit_seconds,
        } => {
            let Some(player_id) = bound_player_id(&state, client_id).await else {
                send_error_to_client(&state, client_id, "send hello first").await;
                return;
            };
            handle_lobby_start(
                state,
                &player_id,
                level.unwrap_or(Level::Normal),
                ai_player_count,
                time_limit_seconds,
            )
            .await;
        }
        ParsedClientMessage::Collect { coin_id } => {
            let Some(player_id) = bound_player_id(&state, client_id).await else {
                send_error_to_client(&state, client_id, "send hello first").await;
                return;
            };
            let mut guard = state.lock().await;
            let Some(game) = guard.game.as_mut() else {
                return;
            };
            if let Err(error) = game.collect_coin(&player_id, &coin_id) {
                debug!(player_id = %player_id, coin_id = %coin_id, %error, "collect rejected");
                let message = error.to_string();
                send_to_client(
                    &mut guard,
                    client_id,
                    &json!({
                        "type": "error",
                        "message": message,
                    }),
                    QueuePolicy::DisconnectOnFull,
                );
            }
        }
        control => {
            let Some(player_id) = bound_player_id(&state, client_id).await else {
                send_error_to_client(&state, client_id, "send hello first").await;
                return;
            };
            handle_host_control(state, client_id, &player_id, control).await;
        }
    }
}

async fn bound_player_id(state: &SharedState, client_id: &str) -> Option<String> {
    let guard = state.lock().await;
    guard
        .clients
        .get(client_id)
        .and_then(|ctx| ctx.player_id.clone())
}

/// Pause, resume, difficulty and restart are reserved for the host.
async fn handle_host_control(
    state: SharedState,
    client_id: &str,
    player_id: &str,
    control: ParsedClientMessage,
) {
    let mut guard = state.lock().await;
    ensure_host_assigned(&mut guard, None);
    if guard.host_id.as_deref() != Some(player_id) {
        send_to_client(
            &mut guard,
            client_id,
            &json!({
                "type": "error",
                "message": "only host can control the session",
            }),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    }
    let Some(game) = guard.game.as_mut() else {
        send_to_client(
            &mut guard,
            client_id,
            &json!({
                "type": "error",
                "message": "game is not running",
            }),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    };

    let result = match control {
        ParsedClientMessage::Pause => game.pause(),
        ParsedClientMessage::Resume => game.resume(),
        ParsedClientMessage::Difficulty { level } => game.configure_difficulty(level),
        ParsedClientMessage::Restart => {
            game.request_restart();
            Ok(())
        }
        _ => Ok(()),
    };
    if let Err(error) = result {
        debug!(player_id = %player_id, %error, "host control rejected");
        let message = error.to_string();
        send_to_client(
            &mut guard,
            client_id,
            &json!({
                "type": "error",
                "message": message,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }
}

async fn handle_hello(
    state: SharedState,
    client_id: &str,
    requested_name: String,
    reconnect_token: Option<String>,
) {
    let mut guard = state.lock().await;
    let name = sanitize_name(&requested_name);

    if let Some(token) = reconnect_token {
        if let Some(existing_id) = find_player_id_by_token(&guard, &token) {
            if let Some(member) = guard.lobby_players.get_mut(&existing_id) {
                member.name = name;
                member.connected = true;
                member.ai = false;
            }
            bind_client_to_player(&mut guard, client_id, &existing_id);
            if let Some(game) = guard.game.as_mut() {
                if game.has_player(&existing_id) {
                    game.set_player_connection(&existing_id, true);
                }
            }
            info!(player_id = %existing_id, "player reconnected");

            ensure_host_assigned(&mut guard, Some(existing_id.clone()));
            send_welcome_and_initial_state(&mut guard, client_id, &existing_id);
            broadcast_lobby(&mut guard, None);
            return;
        }
    }

    if guard.game.is_some() {
        send_to_client(
            &mut guard,
            client_id,
            &json!({
                "type": "error",
                "message": "game already running; reconnection only",
            }),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    }

    let player_id = make_id("player");
    let player = LobbyPlayerInternal {
        id: player_id.clone(),
        name,
        connected: true,
        ai: false,
        reconnect_token: make_reconnect_token(),
    };
    info!(player_id = %player_id, name = %player.name, "player joined lobby");

    guard.lobby_players.insert(player_id.clone(), player);
    bind_client_to_player(&mut guard, client_id, &player_id);
    ensure_host_assigned(&mut guard, Some(player_id.clone()));
    send_welcome_and_initial_state(&mut guard, client_id, &player_id);
    broadcast_lobby(&mut guard, None);
}

async fn handle_lobby_start(
    state: SharedState,
    requested_by: &str,
    level: Level,
    ai_player_count: Option<i64>,
    time_limit_seconds: Option<i64>,
) {
    let mut guard = state.lock().await;
    if guard.game.is_some() {
        return;
    }

    ensure_host_assigned(&mut guard, None);
    if guard.host_id.as_deref() != Some(requested_by) {
        if let Some(client_id) = guard.active_client_by_player_id.get(requested_by).cloned() {
            send_to_client(
                &mut guard,
                &client_id,
                &json!({
                    "type": "error",
                    "message": "only host can start",
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
        return;
    }

    let mut human_ids: Vec<String> = guard
        .lobby_players
        .values()
        .filter(|player| player.connected)
        .map(|player| player.id.clone())
        .collect();
    human_ids.sort_by_key(|id| player_order_key(id));

    let mut start_players = Vec::new();
    for player_id in &human_ids {
        let Some(player) = guard.lobby_players.get(player_id) else {
            continue;
        };
        start_players.push(StartPlayer {
            id: player.id.clone(),
            name: player.name.clone(),
            reconnect_token: player.reconnect_token.clone(),
            connected: player.connected,
        });
    }

    let ai_count = normalize_ai_count(ai_player_count);
    for idx in 0..ai_count {
        start_players.push(StartPlayer {
            id: format!("ai_{}", make_id("id")),
            name: format!("AI-{:02}", idx + 1),
            reconnect_token: make_reconnect_token(),
            connected: false,
        });
    }

    let mut game = GameEngine::new(
        start_players,
        level,
        now_ms() as u32,
        GameEngineOptions {
            time_limit_ms_override: normalize_time_limit_ms(time_limit_seconds),
            ..GameEngineOptions::default()
        },
    );
    if let Err(error) = game.start() {
        warn!(%error, "session failed to start");
        let message = error.to_string();
        if let Some(client_id) = guard.active_client_by_player_id.get(requested_by).cloned() {
            send_to_client(
                &mut guard,
                &client_id,
                &json!({
                    "type": "error",
                    "message": message,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
        return;
    }

    let config = game.config.clone();
    let started_at_ms = game.started_at_ms;
    let seed = game.seed();
    info!(
        humans = human_ids.len(),
        ai = ai_count,
        level = ?level,
        time_limit_ms = config.time_limit_ms,
        seed,
        "session started"
    );
    guard.running_ai_count = ai_count;
    guard.game = Some(game);

    let start_note = format!(
        "session started (human:{}, ai:{}, limit:{}s)",
        human_ids.len(),
        ai_count,
        config.time_limit_ms / 1_000
    );
    broadcast_lobby(&mut guard, Some(start_note));

    let members: Vec<LobbyPlayerInternal> = guard
        .lobby_players
        .values()
        .filter(|member| member.connected)
        .cloned()
        .collect();
    for member in members {
        if let Some(client_id) = guard.active_client_by_player_id.get(&member.id).cloned() {
            send_to_client(
                &mut guard,
                &client_id,
                &json!({
                    "type": "game_init",
                    "meId": member.id,
                    "config": config,
                    "startedAtMs": started_at_ms,
                    "seed": seed,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    disconnect_client_internal(&mut guard, client_id, true);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str, broadcast_after: bool) {
    let Some(context) = state.clients.remove(client_id) else {
        return;
    };
    let Some(bound_player_id) = context.player_id else {
        return;
    };

    if state
        .active_client_by_player_id
        .get(&bound_player_id)
        .map(|active| active != client_id)
        .unwrap_or(true)
    {
        return;
    }

    state.active_client_by_player_id.remove(&bound_player_id);
    debug!(player_id = %bound_player_id, "player disconnected");

    let game_has_player = state
        .game
        .as_ref()
        .map(|game| game.has_player(&bound_player_id))
        .unwrap_or(false);
    if game_has_player {
        if let Some(member) = state.lobby_players.get_mut(&bound_player_id) {
            member.connected = false;
            member.ai = true;
        }
        if let Some(game) = state.game.as_mut() {
            game.set_player_connection(&bound_player_id, false);
        }
    } else {
        state.lobby_players.remove(&bound_player_id);
    }

    if state.host_id.as_deref() == Some(&bound_player_id) {
        state.host_id = choose_next_host(state);
    }

    if broadcast_after {
        broadcast_lobby(state, None);
    }
}

fn send_welcome_and_initial_state(state: &mut ServerState, client_id: &str, player_id: &str) {
    let Some(member) = state.lobby_players.get(player_id).cloned() else {
        return;
    };

    send_to_client(
        state,
        client_id,
        &json!({
            "type": "welcome",
            "playerId": member.id,
            "reconnectToken": member.reconnect_token,
            "isHost": state.host_id.as_deref() == Some(player_id),
        }),
        QueuePolicy::DisconnectOnFull,
    );

    let Some(game) = state.game.as_mut() else {
        return;
    };
    let config = game.config.clone();
    let started_at_ms = game.started_at_ms;
    let seed = game.seed();
    let snapshot = game.build_snapshot(false);

    send_to_client(
        state,
        client_id,
        &json!({
            "type": "game_init",
            "meId": member.id,
            "config": config,
            "startedAtMs": started_at_ms,
            "seed": seed,
        }),
        QueuePolicy::DisconnectOnFull,
    );

    send_to_client(
        state,
        client_id,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn bind_client_to_player(state: &mut ServerState, client_id: &str, player_id: &str) {
    if let Some(old_client_id) = state.active_client_by_player_id.get(player_id).cloned() {
        if old_client_id != client_id {
            if let Some(old_client) = state.clients.get_mut(&old_client_id) {
                old_client.player_id = None;
                let _ = old_client.tx.try_send(OutboundMessage::Close {
                    code: 4001,
                    reason: "superseded by new connection".to_string(),
                });
            }
        }
    }

    let previous_player_id = state
        .clients
        .get(client_id)
        .and_then(|ctx| ctx.player_id.clone());
    if let Some(previous_player_id) = previous_player_id {
        if previous_player_id != player_id {
            state.active_client_by_player_id.remove(&previous_player_id);
        }
    }

    if let Some(ctx) = state.clients.get_mut(client_id) {
        ctx.player_id = Some(player_id.to_string());
    }
    state
        .active_client_by_player_id
        .insert(player_id.to_string(), client_id.to_string());
}

fn broadcast_lobby(state: &mut ServerState, note: Option<String>) {
    ensure_host_assigned(state, None);

    let mut players: Vec<LobbyPlayerInternal> = state.lobby_players.values().cloned().collect();
    players.sort_by(|a, b| a.name.cmp(&b.name));

    let can_start = state
        .host_id
        .as_ref()
        .and_then(|host_id| state.lobby_players.get(host_id))
        .map(|host| host.connected)
        .unwrap_or(false);

    let composed_note = if state.running_ai_count > 0 && note.is_none() {
        Some(format!("AI players running: {}", state.running_ai_count))
    } else {
        note
    };

    let players_payload: Vec<Value> = players
        .iter()
        .map(|player| {
            json!({
                "id": player.id,
                "name": player.name,
                "connected": player.connected,
                "ai": player.ai,
                "isHost": state.host_id.as_deref() == Some(player.id.as_str()),
            })
        })
        .collect();

    broadcast(
        state,
        &json!({
            "type": "lobby",
            "players": players_payload,
            "hostId": state.host_id,
            "canStart": can_start,
            "running": state.game.is_some(),
            "note": composed_note,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    let snapshot = {
        let Some(game) = state.game.as_mut() else {
            return;
        };
        game.step(TICK_MS);
        game.build_snapshot(true)
    };

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    let (summary, restart) = {
        let Some(game) = state.game.as_ref() else {
            return;
        };
        let summary = if game.is_ended() {
            Some(game.build_summary())
        } else {
            None
        };
        (summary, game.restart_requested())
    };

    if let Some(summary) = summary {
        info!(
            reason = summary.reason.map(|reason| reason.key()).unwrap_or("none"),
            duration_ms = summary.duration_ms,
            total_collected = summary.total_collected,
            "session ended"
        );
        broadcast(
            state,
            &json!({
                "type": "game_over",
                "summary": summary,
            }),
            QueuePolicy::DisconnectOnFull,
        );
        state.last_summary = Some(summary);
        return_to_lobby(state, "session ended; ready to start again");
        return;
    }

    if restart {
        info!("restart requested; returning to lobby");
        return_to_lobby(state, "restart requested");
    }
}

fn return_to_lobby(state: &mut ServerState, note: &str) {
    state.game = None;
    state.running_ai_count = 0;
    state.lobby_players.retain(|_, player| player.connected);
    for player in state.lobby_players.values_mut() {
        player.ai = false;
    }

    ensure_host_assigned(state, None);
    broadcast_lobby(state, Some(note.to_string()));
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client_internal(state, client_id, false);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let client_ids: Vec<String> = state.clients.keys().cloned().collect();
    let mut failed_clients = Vec::new();
    for client_id in client_ids {
        let Some(client) = state.clients.get(&client_id) else {
            continue;
        };
        if !can_receive_broadcast(state, &client_id, client) {
            continue;
        }
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id);
        }
    }
    if policy == QueuePolicy::DisconnectOnFull {
        for client_id in failed_clients {
            disconnect_client_internal(state, &client_id, false);
        }
    }
}

fn can_receive_broadcast(state: &ServerState, client_id: &str, client: &ClientContext) -> bool {
    let Some(player_id) = client.player_id.as_ref() else {
        return false;
    };
    if state
        .active_client_by_player_id
        .get(player_id)
        .map(|id| id.as_str())
        != Some(client_id)
    {
        return false;
    }
    state.lobby_players.contains_key(player_id)
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn ensure_host_assigned(state: &mut ServerState, preferred_player_id: Option<String>) {
    if state
        .host_id
        .as_ref()
        .and_then(|host_id| state.lobby_players.get(host_id))
        .map(|host| host.connected)
        .unwrap_or(false)
    {
        return;
    }

    if let Some(preferred_player_id) = preferred_player_id {
        if state
            .lobby_players
            .get(&preferred_player_id)
            .map(|player| player.connected)
            .unwrap_or(false)
        {
            state.host_id = Some(preferred_player_id);
            return;
        }
    }

    state.host_id = choose_next_host(state);
}

fn choose_next_host(state: &ServerState) -> Option<String> {
    let mut connected: Vec<&LobbyPlayerInternal> = state
        .lobby_players
        .values()
        .filter(|player| player.connected)
        .collect();
    connected.sort_by_key(|player| player_order_key(&player.id));
    connected.first().map(|player| player.id.clone())
}

fn find_player_id_by_token(state: &ServerState, token: &str) -> Option<String> {
    state
        .lobby_players
        .values()
        .find(|player| player.reconnect_token == token)
        .map(|player| player.id.clone())
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn make_reconnect_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

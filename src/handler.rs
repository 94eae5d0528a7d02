//! WebSocket upgrade and per-socket event loop.
//!
//! Admission happens after the upgrade completes, because a refusal is
//! communicated as a close code on the established socket. The sequence is
//! fixed: probe check, classification, IP quota, room capacity, then the
//! connection is identified and joined. Any refusal closes the socket with
//! the matching code and stops there.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::response::IntoResponse;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::classify::{RoomClass, RoomKind};
use crate::connection::{close_code, OutgoingMessage, WsConnection};
use crate::AppState;

/// Capacity of the per-connection outgoing channel. A peer that lets this
/// many frames pile up counts as dead.
const OUTGOING_BUFFER: usize = 256;

/// `GET /` — an empty path is treated as the `default` probe room.
pub async fn ws_root_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, "default".to_string(), peer))
}

/// `GET /*room` — everything after the leading slash is the room id.
pub async fn ws_room_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, peer))
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

async fn handle_socket(mut socket: WebSocket, state: AppState, room_id: String, peer: SocketAddr) {
    if room_id == "default" {
        debug!(peer = %peer, "probe connection, closing normally");
        close_with(&mut socket, close_code::NORMAL, "test connection").await;
        return;
    }

    let Some(kind) = RoomClass::parse(&room_id).kind() else {
        warn!(room_id = %room_id, peer = %peer, "rejecting unsupported room");
        close_with(
            &mut socket,
            close_code::POLICY_VIOLATION,
            "Unauthorized room access",
        )
        .await;
        return;
    };

    let peer_ip = peer.ip();
    if !state.quota.admit(peer_ip, &room_id).await {
        warn!(room_id = %room_id, peer = %peer, "per-IP connection quota exceeded");
        close_with(
            &mut socket,
            close_code::POLICY_VIOLATION,
            "Too many connections per IP per room",
        )
        .await;
        return;
    }

    if state.registry.active_client_count(&room_id).await >= state.config.max_clients_per_room {
        // The slot taken above must not leak.
        state.quota.release(peer_ip, &room_id).await;
        warn!(room_id = %room_id, peer = %peer, "room capacity exceeded");
        close_with(
            &mut socket,
            close_code::POLICY_VIOLATION,
            "Room capacity exceeded",
        )
        .await;
        return;
    }

    let (tx, mut rx) = mpsc::channel::<OutgoingMessage>(OUTGOING_BUFFER);
    let conn = Arc::new(RwLock::new(WsConnection::new(room_id.clone(), peer_ip, tx)));
    let client_id = conn.read().await.client_id.clone();

    let active = state.registry.add_client(&room_id, kind, conn.clone()).await;
    info!(client_id = %client_id, room_id = %room_id, kind = %kind, active, "client connected");

    loop {
        tokio::select! {
            Some(out) = rx.recv() => {
                match out {
                    OutgoingMessage::Binary(data) => {
                        if socket.send(Message::Binary(data)).await.is_err() {
                            break;
                        }
                    }
                    OutgoingMessage::Ping => {
                        if socket.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                    OutgoingMessage::Close { code, reason } => {
                        close_with(&mut socket, code, reason).await;
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        conn.write().await.mark_alive();
                        handle_room_message(&state, &room_id, kind, &client_id, &data).await;
                    }
                    Some(Ok(Message::Text(text))) => {
                        // Some clients frame everything as text.
                        conn.write().await.mark_alive();
                        handle_room_message(&state, &room_id, kind, &client_id, text.as_bytes())
                            .await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        conn.write().await.mark_alive();
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // axum answers pings itself; still proof of life.
                        conn.write().await.mark_alive();
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(client_id = %client_id, "client initiated close");
                        break;
                    }
                    Some(Err(e)) => {
                        error!(client_id = %client_id, room_id = %room_id, "websocket error: {}", e);
                        close_with(&mut socket, close_code::INTERNAL_ERROR, "internal error")
                            .await;
                        break;
                    }
                    None => {
                        debug!(client_id = %client_id, "websocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Disconnect path: membership first, then the quota slot.
    let remaining = state.registry.remove_client(&room_id, &client_id).await;
    state.quota.release(peer_ip, &room_id).await;
    info!(client_id = %client_id, room_id = %room_id, remaining, "client disconnected");
}

/// Route one inbound payload.
///
/// File-tree rooms speak JSON directory events; a payload that decodes to
/// `{"type": "fileTree", …}` is routed as a typed broadcast. Everything
/// else — including malformed JSON in a file-tree room — is relayed
/// byte-for-byte as an opaque broadcast. Code-editor payloads always take
/// the generic path, where the registry mirrors them into the document
/// replica before fan-out.
async fn handle_room_message(
    state: &AppState,
    room_id: &str,
    kind: RoomKind,
    sender_id: &str,
    payload: &[u8],
) {
    if kind == RoomKind::FileTree {
        if let Some(action) = file_tree_action(payload) {
            debug!(room_id, action = %action, "file tree event");
            state.registry.broadcast(room_id, payload, sender_id).await;
            return;
        }
    }
    state.registry.broadcast(room_id, payload, sender_id).await;
}

/// Extract the action of a typed file-tree event, or `None` when the
/// payload is not one.
fn file_tree_action(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    if value.get("type").and_then(|v| v.as_str()) != Some("fileTree") {
        return None;
    }
    let action = value
        .get("action")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    Some(action.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_file_tree_event_is_recognized() {
        let payload =
            br#"{"type":"fileTree","action":"create","data":{"fileId":9,"fileName":"x.ts"}}"#;
        assert_eq!(file_tree_action(payload), Some("create".to_string()));
    }

    #[test]
    fn test_action_defaults_to_unknown() {
        assert_eq!(
            file_tree_action(br#"{"type":"fileTree"}"#),
            Some("unknown".to_string())
        );
    }

    #[test]
    fn test_other_json_types_are_not_typed_events() {
        assert_eq!(file_tree_action(br#"{"type":"cursor"}"#), None);
        assert_eq!(file_tree_action(br#"{"action":"create"}"#), None);
    }

    #[test]
    fn test_malformed_payloads_are_not_typed_events() {
        assert_eq!(file_tree_action(b"{not json"), None);
        assert_eq!(file_tree_action(&[0xff, 0xfe]), None);
    }
}

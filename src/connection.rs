//! Per-connection state for WebSocket connections.

use std::net::IpAddr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc;

/// Unique connection ID, shape `client_<millis>_<random>`.
pub type ClientId = String;

/// WebSocket close codes the server uses.
pub mod close_code {
    /// Normal closure, used to answer probe connections on `/default`.
    pub const NORMAL: u16 = 1000;
    /// Server shutting down.
    pub const GOING_AWAY: u16 = 1001;
    /// Policy violation: unauthorized room, quota or capacity breach,
    /// force cleanup.
    pub const POLICY_VIOLATION: u16 = 1008;
    /// Internal error during connection setup or handling.
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Outgoing message to send to a WebSocket client.
#[derive(Debug, Clone)]
pub enum OutgoingMessage {
    /// Binary payload (CRDT updates, file-tree events, anything relayed).
    Binary(Vec<u8>),
    /// Heartbeat ping frame.
    Ping,
    /// Close the connection with a code and reason.
    Close { code: u16, reason: &'static str },
}

/// Per-connection state.
///
/// The socket task owns the receiving half of `sender`'s channel; everything
/// else reaches the peer only through these non-blocking sends. A peer whose
/// channel is full or closed counts as dead.
#[derive(Debug)]
pub struct WsConnection {
    /// Server-generated connection ID.
    pub client_id: ClientId,

    /// Room this connection was admitted to.
    pub room_id: String,

    /// Remote peer address, keys the connection quota.
    pub peer_ip: IpAddr,

    /// Liveness flag. Cleared at every heartbeat tick, set again by a pong
    /// or any inbound message. A connection that stays `false` for a full
    /// interval is terminated on the next tick.
    pub alive: bool,

    /// When the connection was admitted.
    pub connected_at: Instant,

    /// Last inbound traffic.
    pub last_activity: Instant,

    /// Sender for outgoing messages to this connection.
    pub sender: mpsc::Sender<OutgoingMessage>,
}

impl WsConnection {
    /// Create a new connection with a fresh client ID.
    pub fn new(room_id: String, peer_ip: IpAddr, sender: mpsc::Sender<OutgoingMessage>) -> Self {
        let now = Instant::now();
        Self {
            client_id: generate_client_id(),
            room_id,
            peer_ip,
            alive: true,
            connected_at: now,
            last_activity: now,
            sender,
        }
    }

    /// Update the last-activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Record proof of life: pong or inbound message.
    pub fn mark_alive(&mut self) {
        self.alive = true;
        self.touch();
    }

    /// Whether the transport can still accept frames.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// The active predicate: open transport, liveness flag set, and both
    /// identifiers assigned. Dormant peers fail this and do not count
    /// toward room capacity.
    pub fn is_active(&self) -> bool {
        self.is_open() && self.alive && !self.client_id.is_empty() && !self.room_id.is_empty()
    }

    /// Send a message to this connection (non-blocking).
    /// Returns false if the channel is full or closed.
    pub fn try_send(&self, msg: OutgoingMessage) -> bool {
        self.sender.try_send(msg).is_ok()
    }

    /// Send a binary payload.
    pub fn try_send_binary(&self, data: Vec<u8>) -> bool {
        self.try_send(OutgoingMessage::Binary(data))
    }

    /// Ask the socket task to close with the given code. Best effort: a
    /// peer too far gone to take the close frame is torn down by the
    /// socket task ending anyway.
    pub fn close(&self, code: u16, reason: &'static str) {
        let _ = self.sender.try_send(OutgoingMessage::Close { code, reason });
    }
}

/// Generate a process-unique client ID: `client_<millis>_<random>`.
pub fn generate_client_id() -> ClientId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("client_{}_{}", millis, suffix)
}

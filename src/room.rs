//! Rooms and the room registry.
//!
//! A room is a broadcast group of WebSocket connections keyed by the URL
//! path they connected on. The registry owns all rooms, routes broadcasts
//! (mirroring code-editor updates into the document registry before
//! fan-out), evicts dead peers, and drives room destruction either
//! immediately or through a per-room grace timer, depending on the room
//! kind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classify::RoomKind;
use crate::connection::{close_code, ClientId, WsConnection};
use crate::document::DocumentRegistry;

/// A room and its members.
pub struct Room {
    pub id: String,
    pub kind: RoomKind,
    pub created_at: Instant,
    clients: RwLock<HashMap<ClientId, Arc<RwLock<WsConnection>>>>,
    last_activity: RwLock<Instant>,
}

impl Room {
    fn new(id: String, kind: RoomKind) -> Self {
        let now = Instant::now();
        Self {
            id,
            kind,
            created_at: now,
            clients: RwLock::new(HashMap::new()),
            last_activity: RwLock::new(now),
        }
    }

    /// Insert a member. Returns false when the client id is already
    /// present (double insert is a no-op).
    async fn insert(&self, conn: Arc<RwLock<WsConnection>>) -> bool {
        let client_id = conn.read().await.client_id.clone();
        let mut clients = self.clients.write().await;
        if clients.contains_key(&client_id) {
            return false;
        }
        clients.insert(client_id, conn);
        true
    }

    /// Remove a member by id. Returns false when it was not present.
    async fn remove(&self, client_id: &str) -> bool {
        self.clients.write().await.remove(client_id).is_some()
    }

    /// Raw member count, including dormant peers.
    pub async fn member_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Members passing the active predicate. This is what admission caps
    /// and cleanup decisions are measured against, not the raw set size.
    pub async fn active_count(&self) -> usize {
        let clients = self.clients.read().await;
        let mut active = 0;
        for conn in clients.values() {
            if conn.read().await.is_active() {
                active += 1;
            }
        }
        active
    }

    async fn touch(&self) {
        *self.last_activity.write().await = Instant::now();
    }
}

/// Aggregate server state, served by the status admin route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    pub total_rooms: usize,
    pub total_clients: usize,
    pub code_editor_rooms: usize,
    pub file_tree_rooms: usize,
    pub grace_period_rooms: usize,
    pub documents_in_memory: usize,
    pub uptime_secs: u64,
    pub memory: MemoryStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub documents: usize,
    pub snapshot_bytes: usize,
}

/// Owner of all rooms, their grace timers, and the broadcast path.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    /// At most one pending destruction timer per room. An armed timer means
    /// the room had zero active clients at arming time; it is aborted the
    /// instant a client joins.
    grace_timers: RwLock<HashMap<String, JoinHandle<()>>>,
    documents: Arc<DocumentRegistry>,
    grace_period: std::time::Duration,
    code_editor_features: bool,
    started_at: Instant,
}

impl RoomRegistry {
    pub fn new(
        documents: Arc<DocumentRegistry>,
        grace_period: std::time::Duration,
        code_editor_features: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            grace_timers: RwLock::new(HashMap::new()),
            documents,
            grace_period,
            code_editor_features,
            started_at: Instant::now(),
        })
    }

    async fn get_room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    async fn get_or_create_room(&self, room_id: &str, kind: RoomKind) -> Arc<Room> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(room_id) {
                return room.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        // Double-check after re-acquiring the lock.
        if let Some(room) = rooms.get(room_id) {
            return room.clone();
        }
        info!(room_id, kind = %kind, "creating room");
        let room = Arc::new(Room::new(room_id.to_string(), kind));
        rooms.insert(room_id.to_string(), room.clone());
        room
    }

    /// Add a connection to a room, creating the room on first insert and
    /// cancelling any pending grace timer. Returns the room's active count.
    pub async fn add_client(
        self: &Arc<Self>,
        room_id: &str,
        kind: RoomKind,
        conn: Arc<RwLock<WsConnection>>,
    ) -> usize {
        if let Some(handle) = self.grace_timers.write().await.remove(room_id) {
            handle.abort();
            info!(room_id, "client rejoined, grace timer cancelled");
        }

        let room = self.get_or_create_room(room_id, kind).await;
        room.insert(conn).await;
        room.touch().await;
        room.active_count().await
    }

    /// Remove a connection from a room. Absent members are a no-op beyond
    /// reporting the current active count. When the room's active count
    /// drops to zero the kind-specific empty-room policy runs.
    pub async fn remove_client(self: &Arc<Self>, room_id: &str, client_id: &str) -> usize {
        let Some(room) = self.get_room(room_id).await else {
            return 0;
        };
        if !room.remove(client_id).await {
            return room.active_count().await;
        }
        room.touch().await;

        let remaining = room.active_count().await;
        debug!(room_id, client_id, remaining, "client removed");
        if remaining == 0 {
            self.on_room_empty(&room.id, room.kind).await;
        }
        remaining
    }

    /// Relay a payload to every room member except the sender.
    ///
    /// For code-editor rooms the payload is applied to the server replica
    /// BEFORE fan-out, so the replica stays consistent with what peers have
    /// already sent even if delivery fails downstream. Members whose send
    /// fails or whose transport is no longer open are collected during the
    /// pass and purged afterwards; a bad peer never aborts the broadcast.
    /// Returns the number of successful deliveries.
    pub async fn broadcast(&self, room_id: &str, payload: &[u8], sender_id: &str) -> usize {
        let Some(room) = self.get_room(room_id).await else {
            return 0;
        };

        if self.code_editor_features && room.kind.allows_document() {
            self.documents.apply_update(room_id, payload).await;
        }

        let mut delivered = 0;
        let mut dead: Vec<ClientId> = Vec::new();
        {
            let clients = room.clients.read().await;
            for (client_id, conn) in clients.iter() {
                if client_id == sender_id {
                    continue;
                }
                let conn = conn.read().await;
                if !conn.is_open() {
                    dead.push(client_id.clone());
                    continue;
                }
                if conn.try_send_binary(payload.to_vec()) {
                    delivered += 1;
                } else {
                    error!(room_id, client_id = %client_id, "send failed, marking peer dead");
                    dead.push(client_id.clone());
                }
            }
        }

        if !dead.is_empty() {
            let mut clients = room.clients.write().await;
            for client_id in &dead {
                clients.remove(client_id);
            }
        }
        room.touch().await;
        delivered
    }

    pub async fn active_client_count(&self, room_id: &str) -> usize {
        match self.get_room(room_id).await {
            Some(room) => room.active_count().await,
            None => 0,
        }
    }

    pub async fn total_active_clients(&self) -> usize {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut total = 0;
        for room in rooms {
            total += room.active_count().await;
        }
        total
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Every connection currently known to any room. Heartbeat input.
    pub async fn all_connections(&self) -> Vec<Arc<RwLock<WsConnection>>> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut connections = Vec::new();
        for room in rooms {
            let clients = room.clients.read().await;
            connections.extend(clients.values().cloned());
        }
        connections
    }

    /// Evict members failing the active predicate from every room. Rooms
    /// whose active count reaches zero get the empty-room policy. Returns
    /// the number of evicted connections.
    pub async fn reap_dead_clients(self: &Arc<Self>) -> usize {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut evicted = 0;

        for room in rooms {
            let dead: Vec<ClientId> = {
                let clients = room.clients.read().await;
                let mut dead = Vec::new();
                for (client_id, conn) in clients.iter() {
                    if !conn.read().await.is_active() {
                        dead.push(client_id.clone());
                    }
                }
                dead
            };
            if dead.is_empty() {
                continue;
            }

            {
                let mut clients = room.clients.write().await;
                for client_id in &dead {
                    if let Some(conn) = clients.remove(client_id) {
                        conn.read()
                            .await
                            .close(close_code::POLICY_VIOLATION, "connection reaped");
                        evicted += 1;
                        warn!(room_id = %room.id, client_id = %client_id, "reaped dead client");
                    }
                }
            }

            if room.active_count().await == 0 {
                self.on_room_empty(&room.id, room.kind).await;
            }
        }
        evicted
    }

    /// Destroy rooms with zero active clients and no pending grace timer.
    /// Returns the number of rooms destroyed.
    pub async fn reap_empty_rooms(&self) -> usize {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut destroyed = 0;

        for room in rooms {
            if room.active_count().await > 0 {
                continue;
            }
            if self.grace_timers.read().await.contains_key(&room.id) {
                continue;
            }
            info!(room_id = %room.id, "reaping empty room");
            self.destroy_room(&room.id, close_code::POLICY_VIOLATION, "room expired")
                .await;
            destroyed += 1;
        }
        destroyed
    }

    /// Emergency drain: close every connection with a policy-violation
    /// code, destroy every room and document, clear all timers. Returns
    /// the number of connections closed.
    pub async fn force_cleanup_all(&self) -> usize {
        let room_ids: Vec<String> = self.rooms.read().await.keys().cloned().collect();
        let mut closed = 0;
        for room_id in room_ids {
            closed += self
                .destroy_room(&room_id, close_code::POLICY_VIOLATION, "server cleanup")
                .await;
        }
        self.documents.destroy_all().await;
        closed
    }

    /// Shutdown sequence: cancel all timers first, then close every
    /// connection with "going away" and destroy all state.
    pub async fn shutdown(&self) {
        let timers: Vec<(String, JoinHandle<()>)> =
            self.grace_timers.write().await.drain().collect();
        for (_, handle) in timers {
            handle.abort();
        }

        let room_ids: Vec<String> = self.rooms.read().await.keys().cloned().collect();
        for room_id in room_ids {
            self.destroy_room(&room_id, close_code::GOING_AWAY, "server shutting down")
                .await;
        }
        self.documents.destroy_all().await;
        info!("room registry shut down");
    }

    /// Kind-specific policy when a room runs out of active clients.
    ///
    /// File-tree and save-point rooms are destroyed on the spot. Code-editor
    /// rooms keep their document alive for a grace period so a reconnecting
    /// editor finds its state intact; the one-shot timer re-checks the
    /// active count when it fires and destroys the room only if it is still
    /// empty.
    pub async fn on_room_empty(self: &Arc<Self>, room_id: &str, kind: RoomKind) {
        if !kind.uses_grace_period() {
            info!(room_id, kind = %kind, "room empty, destroying immediately");
            self.destroy_room(room_id, close_code::POLICY_VIOLATION, "room empty")
                .await;
            return;
        }

        let mut timers = self.grace_timers.write().await;
        if timers.contains_key(room_id) {
            return;
        }

        info!(
            room_id,
            grace_ms = self.grace_period.as_millis() as u64,
            "room empty, arming grace timer"
        );
        let registry = Arc::clone(self);
        let timer_room = room_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(registry.grace_period).await;
            // The entry comes out of the set whether or not the room dies.
            registry.grace_timers.write().await.remove(&timer_room);

            if registry.active_client_count(&timer_room).await == 0 {
                info!(room_id = %timer_room, "grace period expired, destroying room");
                registry
                    .destroy_room(&timer_room, close_code::POLICY_VIOLATION, "room expired")
                    .await;
            } else {
                info!(room_id = %timer_room, "room repopulated during grace period");
            }
        });
        timers.insert(room_id.to_string(), handle);
    }

    /// Remove a room, close any lingering members with the given code, and
    /// destroy its document if it had one. Returns how many members were
    /// closed.
    async fn destroy_room(&self, room_id: &str, code: u16, reason: &'static str) -> usize {
        if let Some(handle) = self.grace_timers.write().await.remove(room_id) {
            handle.abort();
        }

        let Some(room) = self.rooms.write().await.remove(room_id) else {
            return 0;
        };

        let members: Vec<Arc<RwLock<WsConnection>>> =
            room.clients.write().await.drain().map(|(_, c)| c).collect();
        for conn in &members {
            conn.read().await.close(code, reason);
        }

        if room.kind.allows_document() {
            self.documents.destroy(room_id).await;
        }
        info!(room_id, kind = %room.kind, members = members.len(), "room destroyed");
        members.len()
    }

    pub async fn status(&self) -> RelayStatus {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut total_clients = 0;
        let mut code_editor_rooms = 0;
        let mut file_tree_rooms = 0;
        for room in &rooms {
            total_clients += room.active_count().await;
            match room.kind {
                RoomKind::CodeEditor => code_editor_rooms += 1,
                RoomKind::FileTree => file_tree_rooms += 1,
                RoomKind::SavePoint => {}
            }
        }

        let documents = self.documents.count().await;
        RelayStatus {
            total_rooms: rooms.len(),
            total_clients,
            code_editor_rooms,
            file_tree_rooms,
            grace_period_rooms: self.grace_timers.read().await.len(),
            documents_in_memory: documents,
            uptime_secs: self.started_at.elapsed().as_secs(),
            memory: MemoryStats {
                documents,
                snapshot_bytes: self.documents.snapshot_bytes().await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OutgoingMessage;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const GRACE: Duration = Duration::from_millis(120_000);

    fn new_registry() -> (Arc<RoomRegistry>, Arc<DocumentRegistry>) {
        let documents = Arc::new(DocumentRegistry::new());
        let registry = RoomRegistry::new(documents.clone(), GRACE, true);
        (registry, documents)
    }

    fn test_conn(
        room_id: &str,
    ) -> (Arc<RwLock<WsConnection>>, mpsc::Receiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let conn = WsConnection::new(
            room_id.to_string(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            tx,
        );
        (Arc::new(RwLock::new(conn)), rx)
    }

    async fn client_id(conn: &Arc<RwLock<WsConnection>>) -> String {
        conn.read().await.client_id.clone()
    }

    #[tokio::test]
    async fn test_add_remove_round_trip() {
        let (registry, _) = new_registry();
        let (conn, _rx) = test_conn("filetree-1");
        let id = client_id(&conn).await;

        assert_eq!(
            registry
                .add_client("filetree-1", RoomKind::FileTree, conn)
                .await,
            1
        );
        assert_eq!(registry.room_count().await, 1);

        // File-tree rooms die the moment they empty.
        assert_eq!(registry.remove_client("filetree-1", &id).await, 0);
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_double_insert_is_a_noop() {
        let (registry, _) = new_registry();
        let (conn, _rx) = test_conn("filetree-1");

        registry
            .add_client("filetree-1", RoomKind::FileTree, conn.clone())
            .await;
        let count = registry
            .add_client("filetree-1", RoomKind::FileTree, conn)
            .await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_remove_of_absent_member_has_no_side_effects() {
        let (registry, _) = new_registry();
        let (conn, _rx) = test_conn("filetree-1");
        registry
            .add_client("filetree-1", RoomKind::FileTree, conn)
            .await;

        assert_eq!(registry.remove_client("filetree-1", "client_0_nobody").await, 1);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_peers_not_sender() {
        let (registry, _) = new_registry();
        let (conn_a, mut rx_a) = test_conn("savepoint-1");
        let (conn_b, mut rx_b) = test_conn("savepoint-1");
        let id_a = client_id(&conn_a).await;

        registry
            .add_client("savepoint-1", RoomKind::SavePoint, conn_a)
            .await;
        registry
            .add_client("savepoint-1", RoomKind::SavePoint, conn_b)
            .await;

        let delivered = registry.broadcast("savepoint-1", &[1, 2], &id_a).await;
        assert_eq!(delivered, 1);

        match rx_b.try_recv() {
            Ok(OutgoingMessage::Binary(data)) => assert_eq!(data, vec![1, 2]),
            other => panic!("expected binary for B, got {:?}", other),
        }
        assert!(rx_a.try_recv().is_err(), "sender must not hear its own message");
    }

    #[tokio::test]
    async fn test_broadcast_purges_dead_peers() {
        let (registry, _) = new_registry();
        let (conn_a, _rx_a) = test_conn("savepoint-1");
        let (conn_b, rx_b) = test_conn("savepoint-1");
        let id_a = client_id(&conn_a).await;

        registry
            .add_client("savepoint-1", RoomKind::SavePoint, conn_a)
            .await;
        registry
            .add_client("savepoint-1", RoomKind::SavePoint, conn_b)
            .await;
        drop(rx_b);

        let delivered = registry.broadcast("savepoint-1", &[9], &id_a).await;
        assert_eq!(delivered, 0);

        let room = registry.get_room("savepoint-1").await.unwrap();
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_mirrors_code_editor_updates() {
        let (registry, documents) = new_registry();
        let (conn_a, _rx_a) = test_conn("repo-7-a.ts");
        let (conn_b, _rx_b) = test_conn("repo-7-a.ts");
        let id_a = client_id(&conn_a).await;

        registry
            .add_client("repo-7-a.ts", RoomKind::CodeEditor, conn_a)
            .await;
        registry
            .add_client("repo-7-a.ts", RoomKind::CodeEditor, conn_b)
            .await;

        // Garbage bytes still fan out; the replica apply is a silent no-op.
        let delivered = registry.broadcast("repo-7-a.ts", &[1, 2], &id_a).await;
        assert_eq!(delivered, 1);
        assert!(documents.info("repo-7-a.ts").await.exists);
    }

    #[tokio::test]
    async fn test_active_count_ignores_dormant_peers() {
        let (registry, _) = new_registry();
        let (conn_a, _rx_a) = test_conn("repo-7-a.ts");
        let (conn_b, _rx_b) = test_conn("repo-7-a.ts");

        registry
            .add_client("repo-7-a.ts", RoomKind::CodeEditor, conn_a.clone())
            .await;
        registry
            .add_client("repo-7-a.ts", RoomKind::CodeEditor, conn_b)
            .await;
        assert_eq!(registry.active_client_count("repo-7-a.ts").await, 2);

        conn_a.write().await.alive = false;
        assert_eq!(registry.active_client_count("repo-7-a.ts").await, 1);

        let room = registry.get_room("repo-7-a.ts").await.unwrap();
        assert_eq!(room.member_count().await, 2);
    }

    #[tokio::test]
    async fn test_reap_dead_clients_evicts_and_runs_empty_policy() {
        let (registry, _) = new_registry();
        let (conn, rx) = test_conn("filetree-5");
        registry
            .add_client("filetree-5", RoomKind::FileTree, conn)
            .await;
        drop(rx);

        let evicted = registry.reap_dead_clients().await;
        assert_eq!(evicted, 1);
        // File-tree empty policy destroys the room in the same pass.
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_reap_empty_rooms_skips_grace_protected_rooms() {
        let (registry, _) = new_registry();
        let (conn, _rx) = test_conn("repo-3-x.ts");
        let id = client_id(&conn).await;

        registry
            .add_client("repo-3-x.ts", RoomKind::CodeEditor, conn)
            .await;
        registry.remove_client("repo-3-x.ts", &id).await;
        assert_eq!(registry.status().await.grace_period_rooms, 1);

        assert_eq!(registry.reap_empty_rooms().await, 0);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_timer_destroys_room_and_document() {
        let (registry, documents) = new_registry();
        let (conn, _rx) = test_conn("repo-3-x.ts");
        let id = client_id(&conn).await;

        registry
            .add_client("repo-3-x.ts", RoomKind::CodeEditor, conn)
            .await;
        documents.ensure("repo-3-x.ts").await;
        registry.remove_client("repo-3-x.ts", &id).await;

        tokio::time::sleep(GRACE + Duration::from_millis(1)).await;
        assert_eq!(registry.room_count().await, 0);
        assert!(!documents.info("repo-3-x.ts").await.exists);
        assert_eq!(registry.status().await.grace_period_rooms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejoin_just_before_expiry_cancels_grace_timer() {
        let (registry, documents) = new_registry();
        let (conn, _rx) = test_conn("repo-3-x.ts");
        let id = client_id(&conn).await;

        registry
            .add_client("repo-3-x.ts", RoomKind::CodeEditor, conn)
            .await;
        documents.ensure("repo-3-x.ts").await;
        registry.remove_client("repo-3-x.ts", &id).await;

        tokio::time::sleep(GRACE - Duration::from_millis(1)).await;
        let (conn2, _rx2) = test_conn("repo-3-x.ts");
        registry
            .add_client("repo-3-x.ts", RoomKind::CodeEditor, conn2)
            .await;
        assert_eq!(registry.status().await.grace_period_rooms, 0);

        tokio::time::sleep(GRACE * 2).await;
        assert_eq!(registry.room_count().await, 1);
        assert!(documents.info("repo-3-x.ts").await.exists);
    }

    #[tokio::test]
    async fn test_force_cleanup_closes_everything() {
        let (registry, documents) = new_registry();
        let (conn_a, mut rx_a) = test_conn("repo-1-a.ts");
        let (conn_b, mut rx_b) = test_conn("filetree-2");

        registry
            .add_client("repo-1-a.ts", RoomKind::CodeEditor, conn_a)
            .await;
        registry
            .add_client("filetree-2", RoomKind::FileTree, conn_b)
            .await;
        documents.ensure("repo-1-a.ts").await;

        let closed = registry.force_cleanup_all().await;
        assert_eq!(closed, 2);
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(documents.count().await, 0);

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.try_recv() {
                Ok(OutgoingMessage::Close { code, .. }) => {
                    assert_eq!(code, close_code::POLICY_VIOLATION)
                }
                other => panic!("expected close frame, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_with_going_away() {
        let (registry, _) = new_registry();
        let (conn, mut rx) = test_conn("savepoint-4");
        registry
            .add_client("savepoint-4", RoomKind::SavePoint, conn)
            .await;

        registry.shutdown().await;
        assert_eq!(registry.room_count().await, 0);
        match rx.try_recv() {
            Ok(OutgoingMessage::Close { code, .. }) => assert_eq!(code, close_code::GOING_AWAY),
            other => panic!("expected close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_counts_kinds() {
        let (registry, _) = new_registry();
        let (conn_a, _rx_a) = test_conn("repo-1-a.ts");
        let (conn_b, _rx_b) = test_conn("filetree-2");

        registry
            .add_client("repo-1-a.ts", RoomKind::CodeEditor, conn_a)
            .await;
        registry
            .add_client("filetree-2", RoomKind::FileTree, conn_b)
            .await;

        let status = registry.status().await;
        assert_eq!(status.total_rooms, 2);
        assert_eq!(status.total_clients, 2);
        assert_eq!(status.code_editor_rooms, 1);
        assert_eq!(status.file_tree_rooms, 1);
        assert_eq!(status.grace_period_rooms, 0);
    }
}

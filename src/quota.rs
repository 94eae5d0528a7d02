//! Per-IP, per-room connection quota.
//!
//! Admission control against a fixed cap of concurrent connections from one
//! peer address into one room. Counters track admitted, still-open
//! connections only: every admit is paired with a release on the disconnect
//! path, and refused admissions never touch the table.

use std::collections::HashMap;
use std::net::IpAddr;

use tokio::sync::RwLock;
use tracing::debug;

pub struct ConnectionQuota {
    max_per_ip_per_room: u32,
    counts: RwLock<HashMap<IpAddr, HashMap<String, u32>>>,
}

impl ConnectionQuota {
    pub fn new(max_per_ip_per_room: u32) -> Self {
        Self {
            max_per_ip_per_room,
            counts: RwLock::new(HashMap::new()),
        }
    }

    /// Try to admit a connection from `ip` into `room_id`.
    ///
    /// Returns false, leaving the table untouched, when the (ip, room) count
    /// is already at the cap; otherwise increments and returns true.
    pub async fn admit(&self, ip: IpAddr, room_id: &str) -> bool {
        let mut counts = self.counts.write().await;
        let rooms = counts.entry(ip).or_default();
        let count = rooms.entry(room_id.to_string()).or_insert(0);
        if *count >= self.max_per_ip_per_room {
            // Undo the entries the lookup may have created.
            if *count == 0 {
                rooms.remove(room_id);
            }
            if rooms.is_empty() {
                counts.remove(&ip);
            }
            return false;
        }
        *count += 1;
        true
    }

    /// Release one admitted connection. Entries are pruned at zero so the
    /// table only ever holds live counts.
    pub async fn release(&self, ip: IpAddr, room_id: &str) {
        let mut counts = self.counts.write().await;
        let Some(rooms) = counts.get_mut(&ip) else {
            return;
        };
        match rooms.get_mut(room_id) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                rooms.remove(room_id);
            }
            None => {}
        }
        if rooms.is_empty() {
            counts.remove(&ip);
        }
    }

    /// Current count for an (ip, room) pair.
    pub async fn count(&self, ip: IpAddr, room_id: &str) -> u32 {
        let counts = self.counts.read().await;
        counts
            .get(&ip)
            .and_then(|rooms| rooms.get(room_id))
            .copied()
            .unwrap_or(0)
    }

    /// Number of tracked peer addresses.
    pub async fn tracked_ips(&self) -> usize {
        self.counts.read().await.len()
    }

    /// Clear every counter. Part of the emergency drain.
    pub async fn reset(&self) {
        let mut counts = self.counts.write().await;
        if !counts.is_empty() {
            debug!(ips = counts.len(), "resetting connection quota table");
        }
        counts.clear();
    }
}

//! Background maintenance: heartbeat and reaper tickers.
//!
//! The heartbeat keeps per-connection liveness honest: every tick it
//! terminates connections that failed the active predicate, then clears the
//! liveness flag on the rest and pings them. A peer that stays silent for a
//! full interval is gone by the next tick.
//!
//! The reaper sweeps dead members and orphaned rooms, and doubles as the
//! anomaly breaker: if the aggregate active-client count ever exceeds the
//! configured threshold, every room is drained and the quota table reset.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::connection::{close_code, OutgoingMessage};
use crate::quota::ConnectionQuota;
use crate::room::RoomRegistry;

/// Cadence of the reap pass. Not configuration: the externally-visible
/// `CLEANUP_INTERVAL` variable is informational only.
pub const REAP_INTERVAL: Duration = Duration::from_secs(20);

/// One heartbeat pass over every known connection. Returns the number of
/// peers pinged.
pub async fn heartbeat_pass(registry: &RoomRegistry) -> usize {
    let mut pinged = 0;
    for conn in registry.all_connections().await {
        let mut conn = conn.write().await;
        if !conn.is_active() {
            warn!(
                client_id = %conn.client_id,
                room_id = %conn.room_id,
                "terminating unresponsive connection"
            );
            conn.close(close_code::POLICY_VIOLATION, "heartbeat timeout");
            continue;
        }
        conn.alive = false;
        if conn.try_send(OutgoingMessage::Ping) {
            pinged += 1;
        }
    }
    pinged
}

/// One reap pass: evict dead members, destroy orphaned rooms, then check
/// the aggregate active-client count against the anomaly threshold and
/// drain everything if it is exceeded.
pub async fn reap_pass(
    registry: &Arc<RoomRegistry>,
    quota: &ConnectionQuota,
    anomaly_threshold: usize,
) {
    let evicted = registry.reap_dead_clients().await;
    let destroyed = registry.reap_empty_rooms().await;
    if evicted > 0 || destroyed > 0 {
        info!(evicted, destroyed, "reap pass complete");
    }

    let active = registry.total_active_clients().await;
    if active > anomaly_threshold {
        warn!(
            active,
            anomaly_threshold, "active-client anomaly, draining all rooms"
        );
        registry.force_cleanup_all().await;
        quota.reset().await;
    }
}

/// Spawn the heartbeat ticker.
pub fn spawn_heartbeat(registry: Arc<RoomRegistry>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            heartbeat_pass(&registry).await;
        }
    })
}

/// Spawn the reaper ticker.
pub fn spawn_reaper(
    registry: Arc<RoomRegistry>,
    quota: Arc<ConnectionQuota>,
    period: Duration,
    anomaly_threshold: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            reap_pass(&registry, &quota, anomaly_threshold).await;
        }
    })
}

//! Periodic keep-alive broadcast

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::registry::Hub;

/// Spawn a task that broadcasts `payload` to every connection each `interval`
///
/// The first broadcast happens one interval after the call. Abort the
/// returned handle to stop it.
pub fn spawn(hub: Arc<Hub>, interval: Duration, payload: Bytes) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tracing::trace!(connections = hub.connection_count(), "Heartbeat tick");
            hub.broadcast_heartbeat(payload.clone());
        }
    })
}

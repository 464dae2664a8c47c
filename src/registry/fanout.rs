//! Fan-out engine
//!
//! Publish operations walk one index under the shared lock and try to
//! enqueue the payload on each matching connection. A full or closed buffer
//! drops the payload for that connection only; the publisher never waits and
//! never learns about individual drops.

use bytes::Bytes;

use super::connection::{Connection, ConnectionId, Delivery, UserId};
use super::store::Hub;

/// Tally of one publish call
#[derive(Debug, Default)]
struct FanOut {
    delivered: u64,
    dropped_full: u64,
    dropped_closed: u64,
    /// Connections to evict once the shared lock is released
    slow: Vec<ConnectionId>,
}

impl Hub {
    /// Deliver to every connection subscribed to `topic`
    pub fn publish_by_topic(&self, topic: &str, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let outcome = {
            let indices = self.indices.read();
            self.deliver_all(indices.resolve(indices.by_topic.get(topic)), &payload)
        };

        tracing::trace!(topic = topic, delivered = outcome.delivered, "Published by topic");
        self.settle(outcome);
    }

    /// Deliver to every connection owned by `user_id`
    pub fn publish_by_user(&self, user_id: UserId, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let outcome = {
            let indices = self.indices.read();
            self.deliver_all(indices.resolve(indices.by_user.get(&user_id)), &payload)
        };

        tracing::trace!(user_id = user_id, delivered = outcome.delivered, "Published by user");
        self.settle(outcome);
    }

    /// Deliver to every connection in `category`
    pub fn publish_by_category(&self, category: &str, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let outcome = {
            let indices = self.indices.read();
            self.deliver_all(indices.resolve(indices.by_category.get(category)), &payload)
        };

        tracing::trace!(
            category = category,
            delivered = outcome.delivered,
            "Published by category"
        );
        self.settle(outcome);
    }

    /// Deliver to the connections of `user_id` whose category is `category`
    pub fn publish_to_client(&self, category: &str, user_id: UserId, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let outcome = {
            let indices = self.indices.read();
            let targets = indices
                .resolve(indices.by_user.get(&user_id))
                .filter(|conn| conn.category == category);
            self.deliver_all(targets, &payload)
        };

        tracing::trace!(
            category = category,
            user_id = user_id,
            delivered = outcome.delivered,
            "Published to client"
        );
        self.settle(outcome);
    }

    /// Deliver to every live connection
    pub fn broadcast_heartbeat(&self, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let outcome = {
            let indices = self.indices.read();
            self.deliver_all(indices.connections.values(), &payload)
        };

        tracing::trace!(delivered = outcome.delivered, "Heartbeat broadcast");
        self.settle(outcome);
    }

    fn deliver_all<'a, I>(&self, targets: I, payload: &Bytes) -> FanOut
    where
        I: IntoIterator<Item = &'a Connection>,
    {
        let evict_slow = self.config().drop_slow_clients;
        let mut outcome = FanOut::default();

        for conn in targets {
            match conn.try_deliver(payload) {
                Delivery::Enqueued => outcome.delivered += 1,
                Delivery::Full => {
                    outcome.dropped_full += 1;
                    tracing::debug!(
                        connection_id = %conn.id,
                        user_id = conn.user_id,
                        "Buffer full, payload dropped"
                    );
                    if evict_slow {
                        outcome.slow.push(conn.id);
                    }
                }
                Delivery::Closed => {
                    outcome.dropped_closed += 1;
                    tracing::debug!(connection_id = %conn.id, "Connection closing, payload dropped");
                }
            }
        }

        outcome
    }

    /// Record counters and evict slow clients. Must run without the lock held.
    fn settle(&self, outcome: FanOut) {
        self.metrics.delivered(outcome.delivered);
        self.metrics.dropped_full(outcome.dropped_full);
        self.metrics.dropped_closed(outcome.dropped_closed);

        for id in outcome.slow {
            if self.remove(id) {
                self.metrics.evicted();
                tracing::warn!(connection_id = %id, "Slow client evicted");
            }
        }
    }
}

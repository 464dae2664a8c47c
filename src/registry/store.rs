//! Connection registry implementation
//!
//! The central registry that owns every live connection and the indices used
//! to select connections for fan-out.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use parking_lot::RwLock;

use super::config::HubConfig;
use super::connection::{normalize_topics, Connection, ConnectionHandle, ConnectionId, UserId};
use crate::stats::{HubMetrics, HubStats, MetricsRecorder};

/// Index buckets are ordered so snapshots come out in registration order
pub(super) type Bucket = BTreeSet<ConnectionId>;

/// All registry state, guarded together by a single lock
#[derive(Default)]
pub(super) struct Indices {
    /// Primary map: every live connection
    pub(super) connections: HashMap<ConnectionId, Connection>,
    pub(super) by_user: HashMap<UserId, Bucket>,
    pub(super) by_category: HashMap<String, Bucket>,
    pub(super) by_topic: HashMap<String, Bucket>,
}

impl Indices {
    fn insert(&mut self, connection: Connection) {
        let id = connection.id;

        self.by_user.entry(connection.user_id).or_default().insert(id);
        self.by_category
            .entry(connection.category.clone())
            .or_default()
            .insert(id);
        for topic in &connection.topics {
            self.by_topic.entry(topic.clone()).or_default().insert(id);
        }

        self.connections.insert(id, connection);
    }

    fn detach(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;

        evict(&mut self.by_user, &connection.user_id, id);
        evict(&mut self.by_category, &connection.category, id);
        for topic in &connection.topics {
            evict(&mut self.by_topic, topic, id);
        }

        Some(connection)
    }

    /// Resolve the ids of a bucket through the primary map
    pub(super) fn resolve<'a>(
        &'a self,
        bucket: Option<&'a Bucket>,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        bucket
            .into_iter()
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }
}

fn evict<K, Q>(index: &mut HashMap<K, Bucket>, key: &Q, id: ConnectionId)
where
    K: Eq + Hash + std::borrow::Borrow<Q>,
    Q: Eq + Hash + ?Sized,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(&id);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

/// Central registry for all live connections
///
/// Thread-safe via a single `RwLock` over all indices. Publishing and stats
/// take the shared lock, registration and removal the exclusive one. Nothing
/// under the lock waits on a channel.
pub struct Hub {
    pub(super) indices: RwLock<Indices>,
    pub(super) metrics: MetricsRecorder,
    config: HubConfig,
}

impl Hub {
    /// Create a new hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a new hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            indices: RwLock::new(Indices::default()),
            metrics: MetricsRecorder::default(),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new connection
    ///
    /// Duplicate topics are collapsed. The returned handle drains the
    /// connection's outbound buffer and observes its close signal.
    pub fn register<I, S>(
        &self,
        user_id: UserId,
        category: impl Into<String>,
        topics: I,
    ) -> ConnectionHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let category = category.into();
        let topics = normalize_topics(topics);
        let (connection, handle) = Connection::open(
            user_id,
            category,
            topics,
            self.config.buffer_capacity,
        );

        tracing::info!(
            connection_id = %connection.id,
            user_id = user_id,
            category = %connection.category,
            topics = ?connection.topics,
            "Connection registered"
        );

        let live = {
            let mut indices = self.indices.write();
            indices.insert(connection);
            indices.connections.len()
        };

        self.metrics.registered();
        tracing::debug!(connection_id = %handle.id(), live = live, "Registry size");

        handle
    }

    /// Remove a connection
    ///
    /// Idempotent: returns `true` only for the call that actually removed the
    /// connection. That call evicts it from every index, fires the close
    /// signal and drops the send side of its buffer.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let detached = self.indices.write().detach(id);

        let Some(connection) = detached else {
            tracing::debug!(connection_id = %id, "Connection already removed");
            return false;
        };

        let fired = connection.close();
        self.metrics.removed();

        tracing::info!(
            connection_id = %id,
            user_id = connection.user_id,
            category = %connection.category,
            "Connection removed"
        );

        // Dropping the connection drops the last sender, closing the buffer.
        drop(connection);
        fired
    }

    /// Remove every connection, returning how many were closed
    pub fn close_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.indices.write());

        let mut closed = 0;
        for connection in drained.connections.into_values() {
            if connection.close() {
                closed += 1;
            }
            self.metrics.removed();
        }

        tracing::info!(connections = closed, "All connections closed");
        closed
    }

    /// Snapshot of every registered connection
    ///
    /// Walks the user index; ids that no longer resolve are skipped.
    pub fn stats(&self) -> Vec<HubStats> {
        let guard = self.indices.read();
        let indices: &Indices = &guard;

        indices
            .by_user
            .values()
            .flat_map(|bucket| indices.resolve(Some(bucket)))
            .map(|conn| HubStats {
                connection_id: conn.id,
                user_id: conn.user_id,
                category: conn.category.clone(),
            })
            .collect()
    }

    /// Delivery counters plus the current live connection count
    pub fn metrics(&self) -> HubMetrics {
        self.metrics.snapshot(self.connection_count())
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.indices.read().connections.len()
    }

    /// Check whether a connection is still registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.indices.read().connections.contains_key(&id)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

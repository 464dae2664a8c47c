//! Connection entity and lifecycle
//!
//! A [`Connection`] is the registry-owned half of a client session: identity,
//! selectors and the send side of the outbound buffer. The adapter owns the
//! matching [`ConnectionHandle`], which drains the buffer and observes the
//! close signal.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Identifier of the user owning a connection
pub type UserId = i64;

/// Process-wide id counter. Ids start at 1 and are never reused.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(pub(crate) u64);

impl ConnectionId {
    pub(super) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered and accepting payloads
    Open,
    /// Close transition has fired
    Closed,
}

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Payload queued on the outbound buffer
    Enqueued,
    /// Buffer at capacity, payload dropped
    Full,
    /// Connection closing or closed, payload dropped
    Closed,
}

/// Registry-owned state for one live session
#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) user_id: UserId,
    pub(crate) category: String,
    pub(crate) topics: Vec<String>,
    tx: mpsc::Sender<Bytes>,
    done: CancellationToken,
    closed: AtomicBool,
}

impl Connection {
    /// Create a connection and the adapter-side handle paired with it
    pub(super) fn open(
        user_id: UserId,
        category: String,
        topics: Vec<String>,
        capacity: usize,
    ) -> (Self, ConnectionHandle) {
        let id = ConnectionId::next();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let done = CancellationToken::new();

        let handle = ConnectionHandle {
            id,
            rx,
            done: done.clone(),
        };

        let connection = Self {
            id,
            user_id,
            category,
            topics,
            tx,
            done,
            closed: AtomicBool::new(false),
        };

        (connection, handle)
    }

    /// Current lifecycle state
    pub(crate) fn state(&self) -> ConnectionState {
        if self.closed.load(Ordering::Acquire) {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Try to enqueue without waiting
    pub(crate) fn try_deliver(&self, payload: &Bytes) -> Delivery {
        if self.state() == ConnectionState::Closed {
            return Delivery::Closed;
        }

        match self.tx.try_send(payload.clone()) {
            Ok(()) => Delivery::Enqueued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Fire the `Open -> Closed` transition.
    ///
    /// Returns `true` only for the caller that won the transition; the close
    /// signal is raised by that caller alone.
    pub(crate) fn close(&self) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.done.cancel();
            true
        } else {
            false
        }
    }
}

/// Adapter-side view of a connection
///
/// Holds the receive side of the outbound buffer and the close signal. The
/// send side stays with the registry; once the connection is removed the
/// buffer is closed and [`recv`](Self::recv) yields `None`.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    rx: mpsc::Receiver<Bytes>,
    done: CancellationToken,
}

impl ConnectionHandle {
    /// Connection id, used to remove the connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the next payload.
    ///
    /// Returns `None` as soon as the connection is closed, even if payloads
    /// are still buffered.
    pub async fn recv(&mut self) -> Option<Bytes> {
        tokio::select! {
            biased;
            _ = self.done.cancelled() => None,
            payload = self.rx.recv() => payload,
        }
    }

    /// Take a buffered payload without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        if self.done.is_cancelled() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Whether the close signal has fired
    pub fn is_closed(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Lifecycle state as seen from the adapter
    pub fn state(&self) -> ConnectionState {
        if self.is_closed() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Resolves once the connection has been closed
    pub fn closed(&self) -> impl Future<Output = ()> + '_ {
        self.done.cancelled()
    }

    /// Owned copy of the close signal, for tasks that outlive a borrow of the handle
    pub fn close_signal(&self) -> CancellationToken {
        self.done.clone()
    }
}

/// Collapse duplicate topics while keeping first-seen order
pub(super) fn normalize_topics<I, S>(topics: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for topic in topics {
        let topic = topic.into();
        if !out.contains(&topic) {
            out.push(topic);
        }
    }
    out
}

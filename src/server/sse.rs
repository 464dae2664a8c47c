//! SSE writer for one connection
//!
//! Turns a [`ConnectionHandle`] into the event stream served by `GET /sse`.
//! The stream owns a [`Subscription`]; when axum drops the stream (peer gone
//! or server shutting down) the connection is removed from the hub.

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::Event;
use bytes::Bytes;
use futures::stream::{self, Stream};

use crate::registry::{ConnectionHandle, ConnectionId, Hub};

/// A registered connection bound to the hub that owns it
pub struct Subscription {
    hub: Arc<Hub>,
    handle: ConnectionHandle,
}

impl Subscription {
    pub fn new(hub: Arc<Hub>, handle: ConnectionHandle) -> Self {
        Self { hub, handle }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// Next frame, or `None` once the connection is closed
    pub async fn next_event(&mut self) -> Option<Event> {
        self.handle.recv().await.map(|payload| render(&payload))
    }

    /// Event stream for `axum::response::Sse`
    pub fn into_stream(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        stream::unfold(self, |mut sub| async move {
            let event = sub.next_event().await?;
            Some((Ok(event), sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.hub.remove(self.handle.id()) {
            tracing::info!(connection_id = %self.handle.id(), "SSE stream ended");
        }
    }
}

/// Render a payload as a `data:` frame. Invalid UTF-8 is replaced.
pub fn render(payload: &Bytes) -> Event {
    Event::default().data(String::from_utf8_lossy(payload))
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_drop_removes_connection() {
        let hub = Arc::new(Hub::new());
        let handle = hub.register(1, "web", ["x"]);
        let signal = handle.close_signal();

        let sub = Subscription::new(Arc::clone(&hub), handle);
        assert_eq!(hub.connection_count(), 1);

        drop(sub);
        assert_eq!(hub.connection_count(), 0);
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_stream_yields_until_removed() {
        let hub = Arc::new(Hub::new());
        let handle = hub.register(1, "web", ["x"]);
        let id = handle.id();
        let mut stream = Box::pin(Subscription::new(Arc::clone(&hub), handle).into_stream());

        hub.publish_by_topic("x", "hello");
        assert!(stream.next().await.is_some());

        hub.remove(id);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_removed_before_drop_is_quiet() {
        let hub = Arc::new(Hub::new());
        let handle = hub.register(1, "web", ["x"]);
        let sub = Subscription::new(Arc::clone(&hub), handle);

        assert!(hub.remove(sub.id()));
        drop(sub);

        assert_eq!(hub.metrics().connections_removed, 1);
    }
}

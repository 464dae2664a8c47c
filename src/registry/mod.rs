//! Connection registry for push fan-out
//!
//! The registry owns every live connection and routes published payloads to
//! the connections selected by user id, category or topic.
//!
//! # Architecture
//!
//! ```text
//!                            Arc<Hub>
//!                 ┌──────────────────────────────┐
//!                 │ RwLock<Indices {             │
//!                 │   connections: id → Conn,    │
//!                 │   by_user:     user → {id},  │
//!                 │   by_category: cat  → {id},  │
//!                 │   by_topic:    topic → {id}, │
//!                 │ }>                           │
//!                 └──────────────┬───────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   [Publisher]            [SSE writer]            [SSE writer]
//!   publish_by_*()         handle.recv()           handle.recv()
//!        │                       ▲                       ▲
//!        └──► try_send ──► mpsc(255) ────────────────────┘
//! ```
//!
//! # Delivery
//!
//! Every connection has a bounded `mpsc` buffer. Publishing never waits: a
//! full buffer drops the payload for that connection only. Payloads are
//! `bytes::Bytes`, so fan-out clones a reference count, not the data.
//!
//! # Removal
//!
//! [`Hub::remove`] takes the connection out of the primary map under the
//! exclusive lock, so only one caller ever holds it. The close transition is
//! additionally gated by a compare-and-swap on the connection's closed flag.

pub mod config;
pub mod connection;
mod fanout;
pub mod store;

pub use config::HubConfig;
pub use connection::{ConnectionHandle, ConnectionId, ConnectionState, UserId};
pub use store::Hub;

//! # push-hub
//!
//! A real-time push hub. Clients hold long-lived SSE connections tagged with
//! a user id, a category (client type) and a set of topics; publishers fan
//! payloads out to the connections matching a selector.
//!
//! The crate is split into:
//!
//! - [`registry`]: connection registry, fan-out engine and lifecycle
//! - [`stats`]: snapshot records and delivery counters
//! - [`heartbeat`]: periodic keep-alive broadcast
//! - [`server`]: axum HTTP/SSE adapter and server lifecycle
//!
//! ```no_run
//! use push_hub::{PushServer, ServerConfig};
//!
//! # async fn example() -> push_hub::Result<()> {
//! let server = PushServer::new(ServerConfig::default());
//! server.run().await
//! # }
//! ```

pub mod error;
pub mod heartbeat;
pub mod registry;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{ConnectionHandle, ConnectionId, Hub, HubConfig, UserId};
pub use server::{PushServer, ServerConfig};
pub use stats::{HubMetrics, HubStats};

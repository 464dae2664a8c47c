//! HTTP/SSE adapter
//!
//! - `GET /sse` registers a connection and streams its payloads
//! - `POST /publishBy*`, `POST /publishToClient` fan out a message
//! - `GET /status`, `GET /metrics` report registry state

pub mod config;
pub mod http;
pub mod listener;
pub mod sse;

pub use config::ServerConfig;
pub use listener::PushServer;
pub use sse::Subscription;

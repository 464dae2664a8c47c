//! Statistics for the push hub
//!
//! - [`HubStats`]: per-connection snapshot records
//! - [`HubMetrics`]: delivery counters

pub mod metrics;
pub mod snapshot;

pub use metrics::HubMetrics;
pub(crate) use metrics::MetricsRecorder;
pub use snapshot::HubStats;

// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod config;
pub mod debounce;
pub mod fetch;
pub mod model;
pub mod orchestrator;
pub mod telemetry;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Aggregator;
pub use crate::config::DashboardConfig;
pub use crate::fetch::{FetchClient, FetchError, ReqwestTransport, Transport};
pub use crate::model::{
    DashboardRecord, HoroscopeReading, ImageOfDay, PipelineState, Selection, ZodiacSign,
};
pub use crate::orchestrator::{Dashboard, PipelineClosed};
pub use crate::upstream::Endpoints;

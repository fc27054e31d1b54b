//! Stack calculator server: axum HTTP transport over a Tower operation
//! pipeline, backed by the `calc-core` calculator.

pub mod cli;
pub mod network;
pub mod service;
pub mod telemetry;

pub use network::{build_router, AppState, NetworkConfig, NetworkModule};
pub use service::{ServerConfig, ServiceStack};

//! HTTP handler definitions for the calculator server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod calculator;
pub mod health;
pub mod history;
pub mod logs;
pub mod response;

pub use calculator::{
    calculator_health, independent_calculate, pop_arguments, push_arguments, stack_operate,
    stack_size,
};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use history::{clear_history, fetch_history};
pub use logs::{get_log_level, set_log_level};
pub use response::{ErrorBody, ResultBody};

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use super::middleware::RequestNumber;
use super::{NetworkConfig, ShutdownController};
use crate::service::{Operation, OperationError, OperationResponse, ServiceStack};
use crate::telemetry::LogLevels;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Calculator, domain services and the operation pipeline.
    pub services: ServiceStack,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration (bind address, TLS, timeouts).
    pub config: Arc<NetworkConfig>,
    /// Named logger levels, adjustable at runtime.
    pub log_levels: Arc<LogLevels>,
    /// Next request number handed out by the request logger. Starts at 1.
    pub request_counter: Arc<AtomicU64>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(
        services: ServiceStack,
        shutdown: Arc<ShutdownController>,
        config: Arc<NetworkConfig>,
        log_levels: Arc<LogLevels>,
    ) -> Self {
        Self {
            services,
            shutdown,
            config,
            log_levels,
            request_counter: Arc::new(AtomicU64::new(1)),
            start_time: Instant::now(),
        }
    }

    /// Stamps the request number on `op` and runs it through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's or the domain service's failure.
    pub async fn dispatch(
        &self,
        request: RequestNumber,
        mut op: Operation,
    ) -> Result<OperationResponse, OperationError> {
        op.ctx_mut().request_number = Some(request.0);
        self.services.pipeline.dispatch(op).await
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::service::ServerConfig;

    AppState::new(
        ServiceStack::build(ServerConfig::default()),
        Arc::new(ShutdownController::new()),
        Arc::new(NetworkConfig::ephemeral()),
        Arc::new(LogLevels::detached("info")),
    )
}

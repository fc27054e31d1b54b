//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use parking_lot::Mutex;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::config::ServerConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::router::OperationRouter;

/// The fully layered operation service.
pub type BoxedPipeline = BoxCloneService<Operation, OperationResponse, OperationError>;

/// Build the operation pipeline by wrapping the `OperationRouter` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded (fail fast before doing any work)
/// 2. `TimeoutLayer` -- enforce per-operation timeouts
/// 3. `MetricsLayer` -- record timing and outcome (closest to the actual handler)
#[must_use]
pub fn build_operation_pipeline(router: OperationRouter, config: &ServerConfig) -> BoxedPipeline {
    let svc = ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .layer(TimeoutLayer)
        .layer(MetricsLayer)
        .service(router);
    BoxCloneService::new(svc)
}

// ---------------------------------------------------------------------------
// OperationPipeline
// ---------------------------------------------------------------------------

/// Shareable handle to the pipeline, usable from HTTP handlers.
///
/// Each dispatch clones the boxed service out of the lock and drives the
/// clone, so the lock is never held across an `.await`.
#[derive(Clone)]
pub struct OperationPipeline {
    inner: Arc<Mutex<BoxedPipeline>>,
}

impl OperationPipeline {
    #[must_use]
    pub fn new(router: OperationRouter, config: &ServerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(build_operation_pipeline(router, config))),
        }
    }

    /// Send one operation through every layer to its domain service.
    ///
    /// # Errors
    ///
    /// Returns whatever the layers or the domain service reject the
    /// operation with.
    pub async fn dispatch(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let svc = self.inner.lock().clone();
        svc.oneshot(op).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

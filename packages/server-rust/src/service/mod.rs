//! Operation routing and execution framework.
//!
//! This module implements the service-oriented operation pipeline:
//!
//! 1. **Construction** (`factory`): transport input -> typed `Operation`
//! 2. **Middleware** (`middleware`): Tower layers (load-shedding, timeout, metrics)
//! 3. **Routing** (`router`): Dispatch to domain services by `service_name`
//! 4. **Domain services** (`domain`): stack, independent and history, sharing one `Calculator`

pub mod config;
pub mod domain;
pub mod factory;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod router;

use std::sync::Arc;

use calc_core::Calculator;

// Re-export key types for convenient access.
pub use config::ServerConfig;
pub use domain::{HistoryService, IndependentService, StackService};
pub use factory::OperationFactory;
pub use middleware::OperationPipeline;
pub use operation::{
    service_names, Operation, OperationContext, OperationError, OperationResponse,
};
pub use registry::{ManagedService, ServiceContext, ServiceRegistry};
pub use router::OperationRouter;

// ---------------------------------------------------------------------------
// ServiceStack
// ---------------------------------------------------------------------------

/// Everything the transport needs to run operations, wired around one
/// shared `Calculator`.
#[derive(Clone)]
pub struct ServiceStack {
    pub config: Arc<ServerConfig>,
    pub calculator: Arc<Calculator>,
    pub registry: Arc<ServiceRegistry>,
    pub factory: Arc<OperationFactory>,
    pub pipeline: OperationPipeline,
}

impl ServiceStack {
    /// Creates the domain services, registers them for lifecycle management
    /// and routes them behind the middleware pipeline.
    #[must_use]
    pub fn build(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let calculator = Arc::new(Calculator::new());

        let stack = Arc::new(StackService::new(Arc::clone(&calculator)));
        let independent = Arc::new(IndependentService::new(Arc::clone(&calculator)));
        let history = Arc::new(HistoryService::new(Arc::clone(&calculator)));

        let registry = Arc::new(ServiceRegistry::new());
        registry.register_arc(Arc::clone(&stack));
        registry.register_arc(Arc::clone(&independent));
        registry.register_arc(Arc::clone(&history));

        let mut router = OperationRouter::new();
        router.register(service_names::STACK, stack);
        router.register(service_names::INDEPENDENT, independent);
        router.register(service_names::HISTORY, history);

        Self {
            pipeline: OperationPipeline::new(router, &config),
            factory: Arc::new(OperationFactory::new(Arc::clone(&config))),
            config,
            calculator,
            registry,
        }
    }

    /// Initializes every registered service.
    ///
    /// # Errors
    ///
    /// Returns the first service initialization failure.
    pub async fn init(&self) -> anyhow::Result<()> {
        let ctx = ServiceContext {
            config: Arc::clone(&self.config),
        };
        self.registry.init_all(&ctx).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn end_to_end_through_the_pipeline() {
        let services = ServiceStack::build(ServerConfig::default());
        services.init().await.unwrap();
        let f = &services.factory;

        let resp = services
            .pipeline
            .dispatch(f.push_operands(Some(json!([3, 4]))))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Size(2));

        let resp = services
            .pipeline
            .dispatch(f.calculate_from_stack(Some("times".into())))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Value(12));

        let resp = services
            .pipeline
            .dispatch(f.calculate_independent(Some("minus".into()), Some(json!([1, 5]))))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Value(-4));

        let resp = services
            .pipeline
            .dispatch(f.fetch_history(None))
            .await
            .unwrap();
        let OperationResponse::History(entries) = resp else {
            panic!("expected history, got {resp:?}");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(services.calculator.history_len(), 2);
    }

    #[tokio::test]
    async fn registry_reset_clears_shared_state() {
        let services = ServiceStack::build(ServerConfig::default());
        services.calculator.push_operands(&[1, 2]);
        services.calculator.calculate_independent("abs", &[-2]).unwrap();

        services.registry.reset_all().await.unwrap();
        assert_eq!(services.calculator.stack_size(), 0);
        assert_eq!(services.calculator.history_len(), 0);
        assert_eq!(services.registry.names(), vec!["stack", "independent", "history"]);
    }
}

//! Operation routing: dispatches `Operation` to domain services by `service_name`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::{Service, ServiceExt};

use super::operation::{Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// Boxed domain service
// ---------------------------------------------------------------------------

/// A type-erased, cloneable Tower service handling operations for one domain.
pub type DomainService = BoxCloneService<Operation, OperationResponse, OperationError>;

type RouterFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// OperationRouter
// ---------------------------------------------------------------------------

/// Routes `Operation` values to the correct domain service by `service_name`.
///
/// Each registered domain service is a `tower::Service<Operation>` keyed by
/// its service name (`"stack"`, `"independent"`, `"history"`). Operations
/// with an unregistered `service_name` return `OperationError::UnknownService`.
#[derive(Clone, Default)]
pub struct OperationRouter {
    services: HashMap<&'static str, DomainService>,
}

impl OperationRouter {
    /// Create a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain service for the given name.
    pub fn register<S>(&mut self, name: &'static str, service: S)
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError>
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        self.services.insert(name, BoxCloneService::new(service));
    }
}

impl Service<Operation> for OperationRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = RouterFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // All registered services must be ready. If any is not ready, return pending.
        for svc in self.services.values_mut() {
            match svc.poll_ready(cx) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let service_name = op.ctx().service_name;
        match self.services.get(service_name) {
            Some(svc) => {
                let svc = svc.clone();
                Box::pin(svc.oneshot(op))
            }
            None => Box::pin(async move {
                Err(OperationError::UnknownService {
                    name: service_name.to_string(),
                })
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::operation::{service_names, OperationContext};

    /// Answers every operation with a size derived from the registered tag.
    #[derive(Clone)]
    struct StubService {
        tag: usize,
    }

    impl Service<Operation> for StubService {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future = RouterFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _op: Operation) -> Self::Future {
            let tag = self.tag;
            Box::pin(async move { Ok(OperationResponse::Size(tag)) })
        }
    }

    fn stack_size_op(service_name: &'static str) -> Operation {
        Operation::StackSize {
            ctx: OperationContext::new(1, service_name, 5000),
        }
    }

    #[tokio::test]
    async fn routes_to_registered_service() {
        let mut router = OperationRouter::new();
        router.register(service_names::STACK, StubService { tag: 1 });

        let resp = router
            .oneshot(stack_size_op(service_names::STACK))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Size(1));
    }

    #[tokio::test]
    async fn unknown_service_returns_error() {
        let mut router = OperationRouter::new();
        router.register(service_names::STACK, StubService { tag: 1 });

        let err = router.oneshot(stack_size_op("nonexistent")).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::UnknownService { name } if name == "nonexistent"
        ));
    }

    #[tokio::test]
    async fn routes_to_correct_service_among_multiple() {
        let mut router = OperationRouter::new();
        router.register(service_names::STACK, StubService { tag: 1 });
        router.register(service_names::INDEPENDENT, StubService { tag: 2 });
        router.register(service_names::HISTORY, StubService { tag: 3 });

        let resp = ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(stack_size_op(service_names::HISTORY))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Size(3));

        let resp = ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(stack_size_op(service_names::INDEPENDENT))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Size(2));
    }

    #[tokio::test]
    async fn cloned_router_shares_registrations() {
        let mut router = OperationRouter::new();
        router.register(service_names::STACK, StubService { tag: 9 });
        let clone = router.clone();

        let resp = clone
            .oneshot(stack_size_op(service_names::STACK))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Size(9));
    }
}

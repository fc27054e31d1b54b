//! Domain services.
//!
//! Each service implements both `ManagedService` (lifecycle) and
//! `tower::Service<Operation>` (request handling). All three share one
//! `Arc<Calculator>`; the per-domain modules only supply the handler that
//! maps an `Operation` onto calculator calls.

/// Generate a domain service backed by the shared calculator.
///
/// `handler` is a plain function `fn(&Calculator, Operation) ->
/// Result<OperationResponse, OperationError>`; `reset` is run by
/// `ManagedService::reset` with the calculator bound to the given name.
macro_rules! domain_service {
    (
        $(#[$meta:meta])*
        $name:ident, $svc_name:expr, handler = $handler:path, reset = |$calc:ident| $reset:expr
    ) => {
        $(#[$meta])*
        pub struct $name {
            calculator: ::std::sync::Arc<::calc_core::Calculator>,
        }

        impl $name {
            #[must_use]
            pub fn new(calculator: ::std::sync::Arc<::calc_core::Calculator>) -> Self {
                Self { calculator }
            }
        }

        #[::async_trait::async_trait]
        impl $crate::service::registry::ManagedService for $name {
            fn name(&self) -> &'static str {
                $svc_name
            }

            async fn init(
                &self,
                _ctx: &$crate::service::registry::ServiceContext,
            ) -> ::anyhow::Result<()> {
                ::tracing::debug!(service = $svc_name, "domain service initialized");
                Ok(())
            }

            async fn reset(&self) -> ::anyhow::Result<()> {
                let $calc: &::calc_core::Calculator = &self.calculator;
                $reset;
                Ok(())
            }

            async fn shutdown(&self, _terminate: bool) -> ::anyhow::Result<()> {
                Ok(())
            }
        }

        impl ::tower::Service<$crate::service::operation::Operation>
            for ::std::sync::Arc<$name>
        {
            type Response = $crate::service::operation::OperationResponse;
            type Error = $crate::service::operation::OperationError;
            type Future = ::std::pin::Pin<
                Box<
                    dyn ::std::future::Future<Output = Result<Self::Response, Self::Error>>
                        + Send,
                >,
            >;

            fn poll_ready(
                &mut self,
                _cx: &mut ::std::task::Context<'_>,
            ) -> ::std::task::Poll<Result<(), Self::Error>> {
                ::std::task::Poll::Ready(Ok(()))
            }

            fn call(&mut self, op: $crate::service::operation::Operation) -> Self::Future {
                let svc = ::std::sync::Arc::clone(self);
                Box::pin(async move { $handler(&svc.calculator, op) })
            }
        }
    };
}

pub mod history;
pub mod independent;
pub mod stack;

pub use history::HistoryService;
pub use independent::IndependentService;
pub use stack::StackService;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

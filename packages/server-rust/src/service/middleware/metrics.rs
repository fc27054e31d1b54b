//! Metrics middleware for operations.
//!
//! Records operation duration and outcome twice: as `tracing` span fields,
//! and through the `metrics` facade (`calc_operations_total` counter and
//! `calc_operation_duration_seconds` histogram). The facade is a no-op
//! unless a recorder such as the Prometheus exporter is installed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{debug_span, Instrument};

use crate::service::operation::{Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments operations with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records operation duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

/// Label value describing how an operation finished.
#[must_use]
pub fn outcome_label(result: &Result<OperationResponse, OperationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(OperationError::Calc(err)) => err.kind().as_str(),
        Err(OperationError::Timeout { .. }) => "timeout",
        Err(OperationError::Overloaded) => "overloaded",
        Err(OperationError::UnknownService { .. } | OperationError::WrongService { .. }) => {
            "misrouted"
        }
        Err(OperationError::Internal(_)) => "internal",
    }
}

impl<S> Service<Operation> for MetricsService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let service_name = op.ctx().service_name;
        let call_id = op.ctx().call_id;
        let operation = op.kind();

        let span = debug_span!(
            "operation",
            service = service_name,
            operation,
            call_id,
            request = op.ctx().request_number,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();
                let outcome = outcome_label(&result);

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                ::metrics::counter!(
                    "calc_operations_total",
                    "service" => service_name,
                    "operation" => operation,
                    "outcome" => outcome
                )
                .increment(1);
                ::metrics::histogram!(
                    "calc_operation_duration_seconds",
                    "service" => service_name,
                    "operation" => operation
                )
                .record(elapsed.as_secs_f64());

                tracing::debug!(
                    service = service_name,
                    call_id,
                    duration_ms,
                    outcome,
                    "operation complete"
                );

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use calc_core::CalcError;
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::{service_names, OperationContext};

    /// Echoes the call id back as a value.
    struct ImmediateService;

    impl Service<Operation> for ImmediateService {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future =
            Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, op: Operation) -> Self::Future {
            let value = i64::try_from(op.ctx().call_id).unwrap_or_default();
            Box::pin(async move { Ok(OperationResponse::Value(value)) })
        }
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_response() {
        let svc = MetricsLayer.layer(ImmediateService);
        let op = Operation::StackSize {
            ctx: OperationContext::new(42, service_names::STACK, 5000),
        };

        let resp = svc.oneshot(op).await.unwrap();
        assert_eq!(resp, OperationResponse::Value(42));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(outcome_label(&Ok(OperationResponse::Size(1))), "ok");
        assert_eq!(outcome_label(&Err(OperationError::Overloaded)), "overloaded");
        assert_eq!(
            outcome_label(&Err(OperationError::Timeout { timeout_ms: 5 })),
            "timeout"
        );
        let calc = CalcError::Underflow {
            requested: "1".into(),
            available: 0,
        };
        assert_eq!(
            outcome_label(&Err(OperationError::Calc(calc.clone()))),
            calc.kind().as_str()
        );
    }
}

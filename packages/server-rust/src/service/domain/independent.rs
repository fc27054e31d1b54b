//! Independent domain service: calculations over explicitly supplied operands.

use calc_core::Calculator;

use crate::service::operation::{service_names, Operation, OperationError, OperationResponse};

domain_service!(
    /// Stateless calculations. Owns no state of its own, so `reset` is a no-op.
    IndependentService, service_names::INDEPENDENT,
    handler = handle,
    reset = |_calc| ()
);

fn handle(calculator: &Calculator, op: Operation) -> Result<OperationResponse, OperationError> {
    match op {
        Operation::CalculateIndependent {
            operation,
            arguments,
            ..
        } => calculator
            .calculate_independent_json(&operation, arguments.as_ref())
            .map(OperationResponse::Value)
            .map_err(Into::into),
        other => Err(OperationError::WrongService {
            service: service_names::INDEPENDENT,
            operation: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use calc_core::{ErrorKind, Origin};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::OperationContext;

    fn calculate(operation: &str, arguments: serde_json::Value) -> Operation {
        Operation::CalculateIndependent {
            ctx: OperationContext::new(1, service_names::INDEPENDENT, 5000),
            operation: operation.to_string(),
            arguments: Some(arguments),
        }
    }

    #[tokio::test]
    async fn calculates_and_records() {
        let calculator = Arc::new(Calculator::new());
        let svc = Arc::new(IndependentService::new(Arc::clone(&calculator)));

        let resp = svc.oneshot(calculate("Pow", json!([2, 10]))).await.unwrap();
        assert_eq!(resp, OperationResponse::Value(1024));

        let history = calculator.history(Some(Origin::Independent));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation, "pow");
    }

    #[tokio::test]
    async fn domain_error_is_reported() {
        let svc = Arc::new(IndependentService::new(Arc::new(Calculator::new())));
        let err = svc.oneshot(calculate("fact", json!([-1]))).await.unwrap_err();
        assert!(matches!(err, OperationError::Calc(e) if e.kind() == ErrorKind::InvalidDomain));
    }

    #[tokio::test]
    async fn rejects_stack_operations() {
        let svc = Arc::new(IndependentService::new(Arc::new(Calculator::new())));
        let err = svc
            .oneshot(Operation::StackSize {
                ctx: OperationContext::new(1, service_names::INDEPENDENT, 5000),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::WrongService { .. }));
    }
}

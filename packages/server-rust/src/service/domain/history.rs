//! History domain service: fetch and clear the calculation ledger.

use calc_core::{parse_origin, Calculator};

use crate::service::operation::{service_names, Operation, OperationError, OperationResponse};

domain_service!(
    /// Read and clear access to the history ledger. `reset` clears it.
    HistoryService, service_names::HISTORY,
    handler = handle,
    reset = |calc| calc.clear_history()
);

fn handle(calculator: &Calculator, op: Operation) -> Result<OperationResponse, OperationError> {
    match op {
        Operation::FetchHistory { flavor, .. } => {
            let filter = parse_origin(flavor.as_deref())?;
            Ok(OperationResponse::History(calculator.history(filter)))
        }
        Operation::ClearHistory { .. } => Ok(OperationResponse::Size(calculator.clear_history())),
        other => Err(OperationError::WrongService {
            service: service_names::HISTORY,
            operation: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use calc_core::{ErrorKind, Origin};
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::OperationContext;

    fn ctx() -> OperationContext {
        OperationContext::new(1, service_names::HISTORY, 5000)
    }

    fn seeded() -> (Arc<Calculator>, Arc<HistoryService>) {
        let calculator = Arc::new(Calculator::new());
        calculator.calculate_independent("plus", &[1, 2]).unwrap();
        calculator.push_operands(&[4, 5]);
        calculator.calculate_from_stack("times").unwrap();
        let svc = Arc::new(HistoryService::new(Arc::clone(&calculator)));
        (calculator, svc)
    }

    #[tokio::test]
    async fn fetch_filters_by_flavor() {
        let (_, svc) = seeded();
        let resp = svc
            .oneshot(Operation::FetchHistory {
                ctx: ctx(),
                flavor: Some("STACK".into()),
            })
            .await
            .unwrap();
        let OperationResponse::History(entries) = resp else {
            panic!("expected history, got {resp:?}");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].origin, Origin::Stack);
        assert_eq!(entries[0].arguments, vec![5, 4]);
    }

    #[tokio::test]
    async fn unknown_flavor_is_invalid_input() {
        let (_, svc) = seeded();
        let err = svc
            .oneshot(Operation::FetchHistory {
                ctx: ctx(),
                flavor: Some("stack".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Calc(ref e) if e.kind() == ErrorKind::InvalidInput));
        assert_eq!(err.to_string(), "Error: unknown flavor: stack");
    }

    #[tokio::test]
    async fn clear_returns_zero() {
        let (calculator, svc) = seeded();
        let resp = svc
            .oneshot(Operation::ClearHistory { ctx: ctx() })
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Size(0));
        assert_eq!(calculator.history_len(), 0);
    }
}

//! Stack domain service: push, pop, size and stack-mode calculation.

use calc_core::Calculator;

use crate::service::operation::{service_names, Operation, OperationError, OperationResponse};

domain_service!(
    /// Owns the shared operand stack. `reset` empties it.
    StackService, service_names::STACK,
    handler = handle,
    reset = |calc| calc.clear_stack()
);

fn handle(calculator: &Calculator, op: Operation) -> Result<OperationResponse, OperationError> {
    match op {
        Operation::CalculateFromStack { operation, .. } => calculator
            .calculate_from_stack(&operation)
            .map(OperationResponse::Value)
            .map_err(Into::into),
        Operation::PushOperands { arguments, .. } => calculator
            .push_json(arguments.as_ref())
            .map(OperationResponse::Size)
            .map_err(Into::into),
        Operation::PopOperands { count, .. } => calculator
            .pop_json(count.as_deref())
            .map(OperationResponse::Size)
            .map_err(Into::into),
        Operation::StackSize { .. } => Ok(OperationResponse::Size(calculator.stack_size())),
        other => Err(OperationError::WrongService {
            service: service_names::STACK,
            operation: other.kind(),
        }),
    }
}

//! The calculator dispatcher: validation, operand acquisition, evaluation
//! and history recording over one shared stack and ledger.
//!
//! # Concurrency
//!
//! The operand stack and the history ledger sit behind a single
//! [`parking_lot::RwLock`]. Every mutation (push, pop, stack-mode
//! calculation, record, clear) runs under the write lock as one critical
//! section; a stack-mode calculation holds it across
//! check -> pop -> evaluate -> record so no other request can observe or
//! interleave with a half-finished cycle. Queries take the read lock.
//! Nothing executed under the lock blocks or performs I/O.
//!
//! # Failure policy
//!
//! Validation failures are detected before any state is touched. The one
//! exception is a stack-mode evaluation failure (e.g. `divide` by zero):
//! the operands have already been popped and are discarded, not restored.
//!
//! # Logging
//!
//! Stack activity is logged under the `calc::stack` target and
//! independent calculations under `calc::independent`, so each can be
//! filtered separately.

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info, Level};

use crate::error::{CalcError, CalcResult};
use crate::history::{HistoryEntry, HistoryLedger, Origin};
use crate::operands::{parse_count, parse_operands};
use crate::operations::Operation;
use crate::stack::OperandStack;

/// Tracing target for stack-mode activity.
pub const STACK_TARGET: &str = "calc::stack";
/// Tracing target for independent-mode activity.
pub const INDEPENDENT_TARGET: &str = "calc::independent";

#[derive(Debug, Default)]
struct CalculatorState {
    stack: OperandStack,
    history: HistoryLedger,
}

/// Shared calculator state plus the operations performed on it.
///
/// Construct one per server and share it behind an `Arc`; tests create as
/// many isolated instances as they need.
#[derive(Debug, Default)]
pub struct Calculator {
    state: RwLock<CalculatorState>,
}

impl Calculator {
    /// Creates a calculator with an empty stack and an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- independent mode --------------------------------------------------

    /// Evaluates `operation` over explicitly supplied operands and records
    /// the outcome as an `INDEPENDENT` history entry.
    ///
    /// # Errors
    ///
    /// - [`CalcError::UnknownOperation`] if the name is not registered
    /// - [`CalcError::ArityMismatch`] if `arguments.len()` differs from the
    ///   operation's arity
    /// - any evaluation error ([`CalcError::DivisionByZero`],
    ///   [`CalcError::InvalidDomain`], [`CalcError::Overflow`])
    pub fn calculate_independent(&self, operation: &str, arguments: &[i64]) -> CalcResult<i64> {
        let outcome = Operation::lookup(operation).and_then(|op| {
            if arguments.len() != op.arity() {
                return Err(CalcError::ArityMismatch {
                    operation: operation.to_string(),
                    expected: op.arity(),
                    actual: arguments.len(),
                });
            }
            let result = op.evaluate(arguments)?;
            self.state
                .write()
                .history
                .record(Origin::Independent, op.name(), arguments.to_vec(), result);
            Ok((op, result))
        });

        match outcome {
            Ok((op, result)) => {
                info!(target: INDEPENDENT_TARGET, "Performing operation {op}. Result is {result}");
                debug!(
                    target: INDEPENDENT_TARGET,
                    "Performing operation: {op}({}) = {result}",
                    join(arguments)
                );
                Ok(result)
            }
            Err(err) => Err(log_failure(INDEPENDENT_TARGET, err)),
        }
    }

    /// Like [`calculate_independent`](Self::calculate_independent), but takes
    /// the operand list as raw JSON. The operation is resolved before the
    /// operands are validated.
    ///
    /// # Errors
    ///
    /// As for `calculate_independent`, plus [`CalcError::InvalidInput`] if
    /// `arguments` is not an array of integers.
    pub fn calculate_independent_json(
        &self,
        operation: &str,
        arguments: Option<&Value>,
    ) -> CalcResult<i64> {
        Operation::lookup(operation)
            .and_then(|_| parse_operands(arguments))
            .map_err(|err| log_failure(INDEPENDENT_TARGET, err))
            .and_then(|arguments| self.calculate_independent(operation, &arguments))
    }

    // -- stack mode --------------------------------------------------------

    /// Pops the operation's operands from the stack (topmost value first),
    /// evaluates, and records a `STACK` history entry.
    ///
    /// # Errors
    ///
    /// - [`CalcError::UnknownOperation`] if the name is not registered
    /// - [`CalcError::InsufficientStackDepth`] if the stack holds fewer
    ///   values than the arity; nothing is popped
    /// - any evaluation error; the popped operands are discarded
    pub fn calculate_from_stack(&self, operation: &str) -> CalcResult<i64> {
        let outcome = Operation::lookup(operation).and_then(|op| {
            let mut state = self.state.write();
            let available = state.stack.len();
            if available < op.arity() {
                return Err(CalcError::InsufficientStackDepth {
                    operation: operation.to_string(),
                    required: op.arity(),
                    available,
                });
            }
            let arguments = state.stack.pop(op.arity())?;
            let result = op.evaluate(&arguments)?;
            state
                .history
                .record(Origin::Stack, op.name(), arguments.clone(), result);
            Ok((op, arguments, result, state.stack.len()))
        });

        match outcome {
            Ok((op, arguments, result, size)) => {
                info!(
                    target: STACK_TARGET,
                    "Performing operation {op}. Result is {result} | stack size: {size}"
                );
                debug!(
                    target: STACK_TARGET,
                    "Performing operation: {op}({}) = {result}",
                    join(&arguments)
                );
                Ok(result)
            }
            Err(err) => Err(log_failure(STACK_TARGET, err)),
        }
    }

    /// Pushes `values` onto the stack in order and returns the new size.
    pub fn push_operands(&self, values: &[i64]) -> usize {
        let size = {
            let mut state = self.state.write();
            state.stack.push(values);
            state.stack.len()
        };
        info!(
            target: STACK_TARGET,
            "Adding total of {} argument(s) to the stack | Stack size: {size}",
            values.len()
        );
        debug!(
            target: STACK_TARGET,
            "Adding arguments: {} | Stack size before {} | stack size after {size}",
            join(values),
            size - values.len()
        );
        size
    }

    /// Validates a raw JSON operand list and pushes it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::InvalidInput`] if `values` is not an array of
    /// integers. The stack is not modified in that case.
    pub fn push_json(&self, values: Option<&Value>) -> CalcResult<usize> {
        let values = parse_operands(values).map_err(|err| log_failure(STACK_TARGET, err))?;
        Ok(self.push_operands(&values))
    }

    /// Removes the top `count` values and returns the new size.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::Underflow`] if `count` exceeds the stack size.
    /// The stack is not modified in that case.
    pub fn pop_operands(&self, count: usize) -> CalcResult<usize> {
        let outcome = {
            let mut state = self.state.write();
            state.stack.pop(count).map(|_| state.stack.len())
        };
        match outcome {
            Ok(size) => {
                info!(
                    target: STACK_TARGET,
                    "Removing total {count} argument(s) from the stack | Stack size: {size}"
                );
                Ok(size)
            }
            Err(err) => Err(log_failure(STACK_TARGET, err)),
        }
    }

    /// Parses a raw pop count (as found in a query string) and pops.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::InvalidInput`] for a missing, fractional or
    /// negative count, and [`CalcError::Underflow`] as for
    /// [`pop_operands`](Self::pop_operands).
    pub fn pop_json(&self, count: Option<&str>) -> CalcResult<usize> {
        let available = self.state.read().stack.len();
        let count = parse_count(count, available).map_err(|err| log_failure(STACK_TARGET, err))?;
        self.pop_operands(count)
    }

    /// Current number of values on the stack.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        let (size, contents) = {
            let state = self.state.read();
            let contents = tracing::enabled!(target: STACK_TARGET, Level::DEBUG)
                .then(|| state.stack.top_first());
            (state.stack.len(), contents)
        };
        info!(target: STACK_TARGET, "Stack size is {size}");
        if let Some(contents) = contents {
            debug!(target: STACK_TARGET, "Stack content (first == top): {contents:?}");
        }
        size
    }

    /// Drops every value on the stack. History is left untouched.
    pub fn clear_stack(&self) {
        self.state.write().stack.clear();
    }

    // -- history -----------------------------------------------------------

    /// Returns recorded calculations in chronological order, optionally
    /// restricted to one origin.
    #[must_use]
    pub fn history(&self, filter: Option<Origin>) -> Vec<HistoryEntry> {
        self.state.read().history.fetch(filter)
    }

    /// Number of recorded calculations.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    /// Removes every history entry and returns the new (zero) size.
    pub fn clear_history(&self) -> usize {
        let mut state = self.state.write();
        state.history.clear();
        state.history.len()
    }
}

fn log_failure(target: &'static str, err: CalcError) -> CalcError {
    // Tracing targets are fixed per call site.
    if target == STACK_TARGET {
        error!(target: STACK_TARGET, kind = err.kind().as_str(), "Server encountered an error ! message: {err}");
    } else {
        error!(target: INDEPENDENT_TARGET, kind = err.kind().as_str(), "Server encountered an error ! message: {err}");
    }
    err
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

//! Typed operations, their context, responses and errors.

use calc_core::{CalcError, HistoryEntry};
use serde_json::Value;

/// Service names used to route operations to domain services.
pub mod service_names {
    pub const STACK: &str = "stack";
    pub const INDEPENDENT: &str = "independent";
    pub const HISTORY: &str = "history";
}

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub service_name: &'static str,
    /// Sequence number assigned by the HTTP request logger, if any.
    pub request_number: Option<u64>,
    pub call_timeout_ms: u64,
}

impl OperationContext {
    /// Creates a context with no request number.
    #[must_use]
    pub fn new(call_id: u64, service_name: &'static str, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            service_name,
            request_number: None,
            call_timeout_ms,
        }
    }
}

/// Typed operation variants dispatched through the pipeline.
///
/// Inputs are carried as received from the transport (raw JSON operands,
/// raw query strings); validation happens in the calculator so that every
/// failure is reported the same way.
#[derive(Debug)]
pub enum Operation {
    /// Evaluate with explicit operands. Service: `independent`.
    CalculateIndependent {
        ctx: OperationContext,
        operation: String,
        arguments: Option<Value>,
    },
    /// Evaluate with operands popped from the stack. Service: `stack`.
    CalculateFromStack {
        ctx: OperationContext,
        operation: String,
    },
    /// Push operands onto the stack. Service: `stack`.
    PushOperands {
        ctx: OperationContext,
        arguments: Option<Value>,
    },
    /// Remove `count` operands from the top of the stack. Service: `stack`.
    PopOperands {
        ctx: OperationContext,
        count: Option<String>,
    },
    /// Report the stack size. Service: `stack`.
    StackSize { ctx: OperationContext },
    /// Fetch history, optionally filtered by flavor. Service: `history`.
    FetchHistory {
        ctx: OperationContext,
        flavor: Option<String>,
    },
    /// Drop every history entry. Service: `history`.
    ClearHistory { ctx: OperationContext },
}

impl Operation {
    /// Returns the operation's context.
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::CalculateIndependent { ctx, .. }
            | Self::CalculateFromStack { ctx, .. }
            | Self::PushOperands { ctx, .. }
            | Self::PopOperands { ctx, .. }
            | Self::StackSize { ctx }
            | Self::FetchHistory { ctx, .. }
            | Self::ClearHistory { ctx } => ctx,
        }
    }

    /// Mutable access to the context, used to stamp request numbers.
    pub fn ctx_mut(&mut self) -> &mut OperationContext {
        match self {
            Self::CalculateIndependent { ctx, .. }
            | Self::CalculateFromStack { ctx, .. }
            | Self::PushOperands { ctx, .. }
            | Self::PopOperands { ctx, .. }
            | Self::StackSize { ctx }
            | Self::FetchHistory { ctx, .. }
            | Self::ClearHistory { ctx } => ctx,
        }
    }

    /// Short variant name for logs and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CalculateIndependent { .. } => "calculate_independent",
            Self::CalculateFromStack { .. } => "calculate_from_stack",
            Self::PushOperands { .. } => "push_operands",
            Self::PopOperands { .. } => "pop_operands",
            Self::StackSize { .. } => "stack_size",
            Self::FetchHistory { .. } => "fetch_history",
            Self::ClearHistory { .. } => "clear_history",
        }
    }
}

/// Successful response from an operation handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResponse {
    /// Result of a calculation.
    Value(i64),
    /// Size of the stack or the history after the operation.
    Size(usize),
    /// Matching history entries.
    History(Vec<HistoryEntry>),
}

/// Errors returned by operation handlers.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown service: {name}")]
    UnknownService { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("operation {operation} cannot be handled by service {service}")]
    WrongService {
        service: &'static str,
        operation: &'static str,
    },
    /// A calculator failure: validation, stack or domain error.
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

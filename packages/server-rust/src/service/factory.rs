//! Operation construction: turns transport input into typed `Operation`s.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use calc_core::MISSING_VALUE;
use serde_json::Value;

use super::config::ServerConfig;
use super::operation::{service_names, Operation, OperationContext};

// ---------------------------------------------------------------------------
// OperationFactory
// ---------------------------------------------------------------------------

/// Builds `Operation` values with a fresh context.
///
/// Each operation gets a unique, monotonically increasing call ID, the
/// service name it routes to, and the configured default timeout.
pub struct OperationFactory {
    config: Arc<ServerConfig>,
    call_id_counter: AtomicU64,
}

impl OperationFactory {
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn make_ctx(&self, service_name: &'static str) -> OperationContext {
        OperationContext::new(
            self.next_call_id(),
            service_name,
            self.config.default_operation_timeout_ms,
        )
    }

    #[must_use]
    pub fn calculate_independent(
        &self,
        operation: Option<String>,
        arguments: Option<Value>,
    ) -> Operation {
        Operation::CalculateIndependent {
            ctx: self.make_ctx(service_names::INDEPENDENT),
            operation: operation_name(operation),
            arguments,
        }
    }

    #[must_use]
    pub fn calculate_from_stack(&self, operation: Option<String>) -> Operation {
        Operation::CalculateFromStack {
            ctx: self.make_ctx(service_names::STACK),
            operation: operation_name(operation),
        }
    }

    #[must_use]
    pub fn push_operands(&self, arguments: Option<Value>) -> Operation {
        Operation::PushOperands {
            ctx: self.make_ctx(service_names::STACK),
            arguments,
        }
    }

    #[must_use]
    pub fn pop_operands(&self, count: Option<String>) -> Operation {
        Operation::PopOperands {
            ctx: self.make_ctx(service_names::STACK),
            count,
        }
    }

    #[must_use]
    pub fn stack_size(&self) -> Operation {
        Operation::StackSize {
            ctx: self.make_ctx(service_names::STACK),
        }
    }

    #[must_use]
    pub fn fetch_history(&self, flavor: Option<String>) -> Operation {
        Operation::FetchHistory {
            ctx: self.make_ctx(service_names::HISTORY),
            flavor,
        }
    }

    #[must_use]
    pub fn clear_history(&self) -> Operation {
        Operation::ClearHistory {
            ctx: self.make_ctx(service_names::HISTORY),
        }
    }
}

/// An absent operation name is looked up, and reported, as `undefined`.
fn operation_name(operation: Option<String>) -> String {
    operation.unwrap_or_else(|| MISSING_VALUE.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

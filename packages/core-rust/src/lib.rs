//! Stack calculator core: operation registry, operand stack, history ledger
//! and the dispatcher that ties them together.
//!
//! The crate has no I/O. A transport layer constructs one [`Calculator`],
//! shares it behind an `Arc`, and calls into it for every request.

pub mod calculator;
pub mod error;
pub mod history;
pub mod operands;
pub mod operations;
pub mod stack;

pub use calculator::{Calculator, INDEPENDENT_TARGET, STACK_TARGET};
pub use error::{CalcError, CalcResult, ErrorKind};
pub use history::{HistoryEntry, HistoryLedger, Origin};
pub use operands::{parse_count, parse_operands, parse_origin, MISSING_VALUE};
pub use operations::{Operation, OPERATIONS};
pub use stack::OperandStack;

//! # Convoflow Context
//!
//! Per-conversation state for Convoflow: the variable store, the persisted
//! session value, `{{name}}` interpolation, the condition mini-language and
//! the execution trace.

mod expression;
mod session;
mod template;
mod trace;
mod variables;

pub use expression::{
    evaluate_condition, parse_condition, Comparison, ComparisonOp,
    ParsedCondition,
};
pub use session::ExecutionSession;
pub use template::{interpolate, interpolate_value, placeholders};
pub use trace::{ExecutionTrace, StepOutcome, StepRecord};
pub use variables::{display_value, VariableStore};

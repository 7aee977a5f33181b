//! Core abstractions for the task flow orchestrator
//!
//! This crate provides the value, result, error and event types shared by
//! the runtime, the built-in task library and the CLI. It does not run
//! anything by itself.

mod error;
pub mod events;
mod plan;
mod policy;
mod result;
mod value;

pub use error::{FlowError, PlanError, TaskError};
pub use events::*;
pub use plan::{FlowPlan, StepSpec, TaskSpec};
pub use policy::{ErrorPolicy, FlowConfig};
pub use result::{StepResult, TaskResult};
pub use value::Value;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

//! Task flow execution runtime
//!
//! This crate runs flows: it expands task slots into concrete invocations,
//! executes the tasks of a step concurrently, and drives steps one after
//! another under the configured error policy.

mod executor;
mod flow;
mod registry;
mod slot;
mod task;

pub use executor::StepExecutor;
pub use flow::{FinalCallback, Flow, FlowPhase};
pub use registry::{TaskMetadata, TaskRegistry};
pub use slot::{ArgGroup, ExpandedTask, Step, TaskSlot};
pub use task::{
    async_fn, spawned, task_fn, AsyncFnTask, AsyncTask, Completion, FnTask, Spawned, Task,
    TaskContext,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Flow is already running")]
    AlreadyRunning,

    #[error("Flow stalled: every pending task dropped its completion handle")]
    Stalled,

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
}

/// Error reported by a single task.
///
/// Task errors never propagate out of the orchestrator. They are stored in
/// the [`StepResult`](crate::StepResult) of the step the task belonged to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Task failed: {0}")]
    Failed(String),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Runtime unavailable: {0}")]
    Runtime(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError::Failed(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError::Failed(message.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Step {step} declares no tasks")]
    EmptyStep { step: usize },

    #[error("Task '{task}' in step {step} declares both times and for_each")]
    ConflictingDirectives { step: usize, task: String },

    #[error("Task '{task}' in step {step} has times = 0, expected a positive count")]
    InvalidTimes { step: usize, task: String },
}

use async_trait::async_trait;
use std::sync::Arc;
use taskflow_core::{StepResult, TaskError, Value};
use taskflow_runtime::{AsyncTask, TaskMetadata};

/// Resolves with its arguments and logs them
pub struct EchoTask;

#[async_trait]
impl AsyncTask for EchoTask {
    async fn execute(
        &self,
        _previous: Option<Arc<StepResult>>,
        args: Vec<Value>,
    ) -> Result<Value, TaskError> {
        for (i, arg) in args.iter().enumerate() {
            tracing::info!("echo arg {}: {}", i, arg);
        }
        Ok(crate::echo_value(args))
    }
}

pub(crate) fn echo_metadata() -> TaskMetadata {
    TaskMetadata {
        description: "Resolves with its argument, or an array of all arguments".to_string(),
        category: "debug".to_string(),
    }
}

/// Always rejects, with the first argument as message
pub struct FailTask;

#[async_trait]
impl AsyncTask for FailTask {
    async fn execute(
        &self,
        _previous: Option<Arc<StepResult>>,
        args: Vec<Value>,
    ) -> Result<Value, TaskError> {
        let message = match args.first() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "fail task invoked".to_string(),
        };
        tracing::warn!("failing on purpose: {}", message);
        Err(TaskError::Failed(message))
    }
}

pub(crate) fn fail_metadata() -> TaskMetadata {
    TaskMetadata {
        description: "Rejects with the given message".to_string(),
        category: "debug".to_string(),
    }
}

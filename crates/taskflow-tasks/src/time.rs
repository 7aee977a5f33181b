use async_trait::async_trait;
use std::sync::Arc;
use taskflow_core::{StepResult, TaskError, Value};
use taskflow_runtime::{AsyncTask, TaskMetadata};
use tokio::time::{sleep, Duration};

/// Waits for `args[0]` milliseconds, then resolves like `echo` on the rest
pub struct DelayTask;

#[async_trait]
impl AsyncTask for DelayTask {
    async fn execute(
        &self,
        _previous: Option<Arc<StepResult>>,
        mut args: Vec<Value>,
    ) -> Result<Value, TaskError> {
        if args.is_empty() {
            return Err(TaskError::failed("delay requires a duration in milliseconds"));
        }
        let delay_ms = args
            .remove(0)
            .as_f64()
            .filter(|ms| *ms >= 0.0)
            .ok_or_else(|| TaskError::failed("delay duration must be a non-negative number"))?
            as u64;

        tracing::debug!("delaying for {}ms", delay_ms);
        sleep(Duration::from_millis(delay_ms)).await;

        Ok(crate::echo_value(args))
    }
}

pub(crate) fn delay_metadata() -> TaskMetadata {
    TaskMetadata {
        description: "Delay for the given milliseconds, then pass the remaining arguments through"
            .to_string(),
        category: "time".to_string(),
    }
}

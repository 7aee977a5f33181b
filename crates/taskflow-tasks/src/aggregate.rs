use async_trait::async_trait;
use std::sync::Arc;
use taskflow_core::{StepResult, TaskError, Value};
use taskflow_runtime::{AsyncTask, TaskMetadata};

/// Resolves with the largest number in the previous step's data
///
/// Non-numeric entries are skipped; strings holding a number count.
pub struct MaxTask;

#[async_trait]
impl AsyncTask for MaxTask {
    async fn execute(
        &self,
        previous: Option<Arc<StepResult>>,
        _args: Vec<Value>,
    ) -> Result<Value, TaskError> {
        let previous =
            previous.ok_or_else(|| TaskError::failed("max needs a previous step"))?;

        previous
            .data
            .iter()
            .filter_map(|value| match value {
                Value::Number(n) => Some(*n),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .fold(None, |max: Option<f64>, n| Some(max.map_or(n, |m| m.max(n))))
            .map(Value::Number)
            .ok_or_else(|| TaskError::failed("previous step produced no numbers"))
    }
}

pub(crate) fn max_metadata() -> TaskMetadata {
    TaskMetadata {
        description: "Maximum number in the previous step's data".to_string(),
        category: "aggregate".to_string(),
    }
}

/// Resolves with the previous step's data as an array
pub struct CollectTask;

#[async_trait]
impl AsyncTask for CollectTask {
    async fn execute(
        &self,
        previous: Option<Arc<StepResult>>,
        _args: Vec<Value>,
    ) -> Result<Value, TaskError> {
        let data = previous.map(|p| p.data.clone()).unwrap_or_default();
        Ok(Value::Array(data))
    }
}

pub(crate) fn collect_metadata() -> TaskMetadata {
    TaskMetadata {
        description: "Previous step's data as an array".to_string(),
        category: "aggregate".to_string(),
    }
}

use crate::{TaskError, Value};

/// Outcome of a single expanded task
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskResult {
    pub error: Option<TaskError>,
    pub data: Value,
}

/// Aggregated outcome of a step, index-aligned to task declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    pub errors: Vec<Option<TaskError>>,
    pub data: Vec<Value>,
}

impl StepResult {
    /// A result with `len` unreported slots.
    pub fn with_len(len: usize) -> Self {
        Self {
            errors: vec![None; len],
            data: vec![Value::Null; len],
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True if any task of the step reported an error.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Option::is_some)
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }

    /// Store the outcome of task `index`.
    pub fn record(&mut self, index: usize, outcome: TaskResult) {
        self.errors[index] = outcome.error;
        self.data[index] = outcome.data;
    }

    pub fn get(&self, index: usize) -> Option<TaskResult> {
        let error = self.errors.get(index)?.clone();
        let data = self.data.get(index)?.clone();
        Some(TaskResult { error, data })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&TaskError>, &Value)> {
        self.errors
            .iter()
            .map(Option::as_ref)
            .zip(self.data.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_errors_counts_any_reported_error() {
        let mut result = StepResult::with_len(3);
        assert!(!result.has_errors());

        result.errors[2] = Some(TaskError::failed("boom"));
        assert!(result.has_errors());
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn records_index_aligned() {
        let mut result = StepResult::with_len(2);
        result.record(1, TaskResult { error: Some("bad".into()), data: Value::Null });
        result.record(0, TaskResult { error: None, data: "a".into() });

        assert_eq!(result.len(), 2);
        assert_eq!(result.get(0).unwrap().data, Value::from("a"));
        assert_eq!(result.get(1).unwrap().error, Some(TaskError::failed("bad")));
        assert!(result.get(2).is_none());
    }
}

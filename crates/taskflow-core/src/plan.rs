use crate::{ErrorPolicy, PlanError, Value};
use serde::{Deserialize, Serialize};

/// Serializable description of a flow built from named tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowPlan {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ErrorPolicy>,
    pub steps: Vec<StepSpec>,
}

impl FlowPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            policy: None,
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    /// Check the plan for structural problems.
    ///
    /// Task names are resolved later, against a registry.
    pub fn validate(&self) -> Result<(), PlanError> {
        for (step_index, step) in self.steps.iter().enumerate() {
            if step.tasks.is_empty() {
                return Err(PlanError::EmptyStep { step: step_index });
            }
            for task in &step.tasks {
                if task.times.is_some() && task.for_each.is_some() {
                    return Err(PlanError::ConflictingDirectives {
                        step: step_index,
                        task: task.task.clone(),
                    });
                }
                if task.times == Some(0) {
                    return Err(PlanError::InvalidTimes {
                        step: step_index,
                        task: task.task.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .flat_map(|s| s.tasks.iter())
            .map(|t| t.task.as_str())
    }
}

/// One step of a plan: tasks that run concurrently
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepSpec {
    pub tasks: Vec<TaskSpec>,
}

impl StepSpec {
    pub fn new(task: TaskSpec) -> Self {
        Self { tasks: vec![task] }
    }

    pub fn and(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }
}

/// A named task plus its argument directives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<serde_json::Value>,
    /// Each array element is used as an argument group verbatim, any other
    /// element becomes a one-argument group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_each: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<usize>,
}

impl TaskSpec {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            args: Vec::new(),
            for_each: None,
            times: None,
        }
    }

    pub fn with_args(mut self, args: Vec<serde_json::Value>) -> Self {
        self.args = args;
        self
    }

    pub fn for_each(mut self, elements: Vec<serde_json::Value>) -> Self {
        self.for_each = Some(elements);
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    pub fn arg_values(&self) -> Vec<Value> {
        self.args.iter().cloned().map(Value::from_plain_json).collect()
    }

    /// Argument groups of the `for_each` directive, if any.
    pub fn arg_groups(&self) -> Option<Vec<Vec<Value>>> {
        self.for_each.as_ref().map(|elements| {
            elements
                .iter()
                .cloned()
                .map(|element| match element {
                    serde_json::Value::Array(items) => {
                        items.into_iter().map(Value::from_plain_json).collect()
                    }
                    other => vec![Value::from_plain_json(other)],
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plan_json() {
        let plan: FlowPlan = serde_json::from_value(json!({
            "name": "heroes",
            "policy": "never_stop",
            "steps": [
                {"tasks": [{"task": "echo", "for_each": ["Aquaman", ["Green Lantern", 2]]}]},
                {"tasks": [{"task": "collect"}, {"task": "echo", "args": ["x"], "times": 2}]}
            ]
        }))
        .unwrap();

        assert_eq!(plan.policy, Some(ErrorPolicy::NeverStop));
        assert_eq!(plan.steps.len(), 2);
        assert!(plan.validate().is_ok());

        let groups = plan.steps[0].tasks[0].arg_groups().unwrap();
        assert_eq!(groups[0], vec![Value::from("Aquaman")]);
        assert_eq!(groups[1], vec![Value::from("Green Lantern"), Value::Number(2.0)]);
        assert_eq!(plan.task_names().collect::<Vec<_>>(), vec!["echo", "collect", "echo"]);
    }

    #[test]
    fn rejects_conflicting_directives() {
        let plan = FlowPlan::new("bad")
            .with_step(StepSpec::new(TaskSpec::new("echo").times(2).for_each(vec![json!(1)])));

        assert_eq!(
            plan.validate(),
            Err(PlanError::ConflictingDirectives { step: 0, task: "echo".into() })
        );
    }

    #[test]
    fn rejects_zero_times_and_empty_steps() {
        let zero = FlowPlan::new("zero").with_step(StepSpec::new(TaskSpec::new("echo").times(0)));
        assert!(matches!(zero.validate(), Err(PlanError::InvalidTimes { step: 0, .. })));

        let empty = FlowPlan::new("empty").with_step(StepSpec::default());
        assert_eq!(empty.validate(), Err(PlanError::EmptyStep { step: 0 }));
    }
}

use crate::{Flow, Task};
use std::collections::HashMap;
use std::sync::Arc;
use taskflow_core::{FlowConfig, FlowPlan, PlanError, Result};

/// Metadata about a registered task
#[derive(Debug, Clone)]
pub struct TaskMetadata {
    pub description: String,
    pub category: String,
}

impl Default for TaskMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

struct RegisteredTask {
    task: Arc<dyn Task>,
    metadata: TaskMetadata,
}

/// Registry of named tasks that plans can refer to
pub struct TaskRegistry {
    tasks: HashMap<String, RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a task under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, task: Arc<dyn Task>, metadata: TaskMetadata) {
        let name = name.into();
        tracing::info!("Registering task: {}", name);
        self.tasks.insert(name, RegisteredTask { task, metadata });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).map(|t| Arc::clone(&t.task))
    }

    /// Registered task names, sorted.
    pub fn list_task_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_metadata(&self, name: &str) -> Option<TaskMetadata> {
        self.tasks.get(name).map(|t| t.metadata.clone())
    }

    /// Compile a plan into a flow with default configuration.
    pub fn build_flow(&self, plan: &FlowPlan) -> Result<Flow> {
        self.build_flow_with(plan, FlowConfig::default())
    }

    /// Compile a plan into a flow. A policy declared by the plan overrides
    /// the one in `config`.
    pub fn build_flow_with(&self, plan: &FlowPlan, config: FlowConfig) -> Result<Flow> {
        plan.validate()?;

        let mut flow = Flow::with_config(config);
        if let Some(policy) = plan.policy {
            flow.set_error_policy(policy);
        }

        for step in &plan.steps {
            for (position, spec) in step.tasks.iter().enumerate() {
                let task = self
                    .get(&spec.task)
                    .ok_or_else(|| PlanError::UnknownTask(spec.task.clone()))?;

                if position == 0 {
                    flow.run_shared(task);
                } else {
                    flow.and_shared(task)?;
                }
                if !spec.args.is_empty() {
                    flow.bind_args(spec.arg_values())?;
                }
                if let Some(groups) = spec.arg_groups() {
                    flow.for_each(groups)?;
                }
                if let Some(n) = spec.times {
                    flow.times(n)?;
                }
            }
        }

        tracing::debug!(plan = %plan.name, steps = flow.step_count(), "compiled plan");
        Ok(flow)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

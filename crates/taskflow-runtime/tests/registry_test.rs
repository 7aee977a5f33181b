// crates/taskflow-runtime/tests/registry_test.rs

use serde_json::json;
use std::sync::{Arc, Mutex};
use taskflow_core::{ErrorPolicy, FlowError, FlowPlan, PlanError, StepResult, Value};
use taskflow_runtime::{task_fn, Task, TaskContext, TaskMetadata, TaskRegistry};

fn test_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register(
        "echo",
        Arc::new(
            task_fn(|ctx, args: Vec<Value>| {
                ctx.resolve(Value::Array(args));
                Ok(())
            })
            .named("echo"),
        ),
        TaskMetadata {
            description: "Resolves with its arguments".to_string(),
            category: "test".to_string(),
        },
    );
    registry.register(
        "count",
        Arc::new(task_fn(|ctx: TaskContext, _args| {
            let count = ctx.previous_data().len() as i64;
            ctx.resolve(count);
            Ok(())
        })),
        TaskMetadata::default(),
    );
    registry
}

fn run_plan(registry: &TaskRegistry, plan: &FlowPlan) -> Option<StepResult> {
    let flow = registry.build_flow(plan).unwrap();
    let outcome = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&outcome);
    flow.start(move |result| *sink.lock().unwrap() = result).unwrap();
    let result = outcome.lock().unwrap().take();
    result
}

#[test]
fn lists_registered_tasks_sorted() {
    let registry = test_registry();

    assert_eq!(registry.list_task_names(), vec!["count", "echo"]);
    assert_eq!(registry.get_metadata("echo").unwrap().category, "test");
    assert_eq!(registry.get_metadata("count").unwrap().category, "general");
    assert!(registry.get("missing").is_none());
}

#[test]
fn named_closures_keep_their_name() {
    let registry = test_registry();

    assert_eq!(registry.get("echo").unwrap().name(), "echo");
    assert_eq!(registry.get("count").unwrap().name(), "fn");
}

#[test]
fn compiles_and_runs_a_plan() {
    let registry = test_registry();
    let plan: FlowPlan = serde_json::from_value(json!({
        "name": "heroes",
        "steps": [
            {"tasks": [
                {"task": "echo", "args": ["X"], "for_each": ["Y", ["Z", 1]]},
                {"task": "echo", "times": 2}
            ]},
            {"tasks": [{"task": "count"}]}
        ]
    }))
    .unwrap();

    let result = run_plan(&registry, &plan).unwrap();

    assert_eq!(result.data, vec![Value::Number(4.0)]);
}

#[test]
fn plan_arguments_reach_tasks_in_order() {
    let registry = test_registry();
    let plan: FlowPlan = serde_json::from_value(json!({
        "name": "args",
        "steps": [{"tasks": [{"task": "echo", "args": ["X"], "for_each": ["Y", ["Z", 1]]}]}]
    }))
    .unwrap();

    let result = run_plan(&registry, &plan).unwrap();

    assert_eq!(
        result.data,
        vec![
            Value::Array(vec!["X".into(), "Y".into()]),
            Value::Array(vec!["X".into(), "Z".into(), Value::Number(1.0)]),
        ]
    );
}

#[test]
fn plan_policy_overrides_default() {
    let registry = test_registry();
    let plan = FlowPlan::new("policy").with_policy(ErrorPolicy::NeverStop);

    let flow = registry.build_flow(&plan).unwrap();

    assert_eq!(flow.error_policy(), ErrorPolicy::NeverStop);
    assert_eq!(flow.step_count(), 0);
}

#[test]
fn unknown_task_is_rejected() {
    let registry = test_registry();
    let plan: FlowPlan = serde_json::from_value(json!({
        "name": "broken",
        "steps": [{"tasks": [{"task": "nope"}]}]
    }))
    .unwrap();

    let error = registry.build_flow(&plan).err().unwrap();

    assert!(matches!(error, FlowError::Plan(PlanError::UnknownTask(name)) if name == "nope"));
}

#[test]
fn invalid_plan_is_rejected_before_lookup() {
    let registry = test_registry();
    let plan: FlowPlan = serde_json::from_value(json!({
        "name": "broken",
        "steps": [{"tasks": [{"task": "nope", "times": 0}]}]
    }))
    .unwrap();

    let error = registry.build_flow(&plan).err().unwrap();

    assert!(matches!(error, FlowError::Plan(PlanError::InvalidTimes { step: 0, .. })));
}

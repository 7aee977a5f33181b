// crates/taskflow-tasks/tests/builtin_test.rs

use serde_json::json;
use taskflow_core::{FlowPlan, StepSpec, TaskError, TaskSpec, Value};
use taskflow_runtime::TaskRegistry;

fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    taskflow_tasks::register_all(&mut registry);
    registry
}

#[test]
fn registers_every_builtin() {
    assert_eq!(
        registry().list_task_names(),
        vec!["collect", "delay", "echo", "fail", "max"]
    );
}

#[tokio::test]
async fn echo_for_each_resolves_in_declaration_order() {
    let plan = FlowPlan::new("superheroes").with_step(StepSpec::new(
        TaskSpec::new("delay").for_each(vec![
            json!([30, "Aquaman"]),
            json!([1, "Green Lantern"]),
            json!([15, "Wonderwomen"]),
        ]),
    ));

    let flow = registry().build_flow(&plan).unwrap();
    let result = flow.execute().await.unwrap().unwrap();

    assert_eq!(
        result.data,
        vec![
            Value::from("Aquaman"),
            Value::from("Green Lantern"),
            Value::from("Wonderwomen"),
        ]
    );
}

#[tokio::test]
async fn echo_returns_arrays_for_several_arguments() {
    let plan = FlowPlan::new("echo").with_step(StepSpec::new(
        TaskSpec::new("echo").with_args(vec![json!("X"), json!(2)]),
    ));

    let result = registry().build_flow(&plan).unwrap().execute().await.unwrap().unwrap();

    assert_eq!(
        result.data,
        vec![Value::Array(vec![Value::from("X"), Value::Number(2.0)])]
    );
}

#[tokio::test]
async fn max_reads_the_previous_step() {
    let plan = FlowPlan::new("maximum")
        .with_step(StepSpec::new(
            TaskSpec::new("echo").for_each(vec![json!(3), json!("17"), json!(11)]),
        ))
        .with_step(StepSpec::new(TaskSpec::new("max")));

    let result = registry().build_flow(&plan).unwrap().execute().await.unwrap().unwrap();

    assert_eq!(result.errors, vec![None]);
    assert_eq!(result.data, vec![Value::Number(17.0)]);
}

#[tokio::test]
async fn collect_gathers_previous_data() {
    let plan = FlowPlan::new("collect")
        .with_step(StepSpec::new(TaskSpec::new("echo").with_args(vec![json!("a")]).times(2)))
        .with_step(StepSpec::new(TaskSpec::new("collect")));

    let result = registry().build_flow(&plan).unwrap().execute().await.unwrap().unwrap();

    assert_eq!(
        result.data,
        vec![Value::Array(vec![Value::from("a"), Value::from("a")])]
    );
}

#[tokio::test]
async fn fail_halts_the_flow_by_default() {
    let plan = FlowPlan::new("failing")
        .with_step(StepSpec::new(TaskSpec::new("fail").with_args(vec![json!("TestError")]))
            .and(TaskSpec::new("delay").with_args(vec![json!(5), json!("b")])))
        .with_step(StepSpec::new(TaskSpec::new("echo").with_args(vec![json!("never")])));

    let result = registry().build_flow(&plan).unwrap().execute().await.unwrap().unwrap();

    assert_eq!(
        result.errors,
        vec![Some(TaskError::Failed("TestError".to_string())), None]
    );
    assert_eq!(result.data, vec![Value::Null, Value::from("b")]);
}

#[tokio::test]
async fn delay_rejects_missing_duration() {
    let plan = FlowPlan::new("bad delay").with_step(StepSpec::new(TaskSpec::new("delay")));

    let result = registry().build_flow(&plan).unwrap().execute().await.unwrap().unwrap();

    assert!(matches!(result.errors[0], Some(TaskError::Failed(_))));
}

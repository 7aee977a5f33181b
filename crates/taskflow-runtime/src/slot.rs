use crate::Task;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use taskflow_core::{FlowError, Value};

/// Arguments for one invocation of a `for_each` task
///
/// A `Vec<Value>` is used verbatim, a single value becomes a one-element
/// group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgGroup(Vec<Value>);

impl ArgGroup {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for ArgGroup {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<Value> for ArgGroup {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<&Value> for ArgGroup {
    fn from(value: &Value) -> Self {
        Self(vec![value.clone()])
    }
}

impl From<&str> for ArgGroup {
    fn from(value: &str) -> Self {
        Self(vec![value.into()])
    }
}

impl From<String> for ArgGroup {
    fn from(value: String) -> Self {
        Self(vec![value.into()])
    }
}

impl From<f64> for ArgGroup {
    fn from(value: f64) -> Self {
        Self(vec![value.into()])
    }
}

impl From<i64> for ArgGroup {
    fn from(value: i64) -> Self {
        Self(vec![value.into()])
    }
}

impl From<bool> for ArgGroup {
    fn from(value: bool) -> Self {
        Self(vec![value.into()])
    }
}

/// How a slot turns into invocations. Setting a directive replaces the
/// previous one, so the last of `times` / `for_each` wins.
#[derive(Debug, Clone, PartialEq)]
enum Expansion {
    Single,
    Times(NonZeroUsize),
    ForEach(Vec<ArgGroup>),
}

/// A declared task plus its argument directives
#[derive(Clone)]
pub struct TaskSlot {
    task: Arc<dyn Task>,
    fixed_args: Vec<Value>,
    expansion: Expansion,
}

impl TaskSlot {
    pub fn new(task: Arc<dyn Task>) -> Self {
        Self {
            task,
            fixed_args: Vec::new(),
            expansion: Expansion::Single,
        }
    }

    /// Arguments prepended to every invocation of this slot.
    pub fn bind_args(&mut self, args: Vec<Value>) {
        self.fixed_args = args;
    }

    pub fn for_each(&mut self, groups: Vec<ArgGroup>) {
        self.expansion = Expansion::ForEach(groups);
    }

    pub fn times(&mut self, n: usize) -> Result<(), FlowError> {
        let n = NonZeroUsize::new(n).ok_or_else(|| {
            FlowError::InvalidArgument("times() requires a positive count".to_string())
        })?;
        self.expansion = Expansion::Times(n);
        Ok(())
    }

    pub fn fixed_args(&self) -> &[Value] {
        &self.fixed_args
    }

    /// Number of invocations this slot expands to.
    pub fn expanded_len(&self) -> usize {
        match &self.expansion {
            Expansion::Single => 1,
            Expansion::Times(n) => n.get(),
            Expansion::ForEach(groups) => groups.len(),
        }
    }

    /// Concrete invocations, in declaration order. The slot is left intact.
    pub fn expand(&self) -> Vec<ExpandedTask> {
        match &self.expansion {
            Expansion::Single => vec![self.instance(Vec::new())],
            Expansion::Times(n) => (0..n.get()).map(|_| self.instance(Vec::new())).collect(),
            Expansion::ForEach(groups) => groups
                .iter()
                .map(|group| self.instance(group.values().to_vec()))
                .collect(),
        }
    }

    fn instance(&self, extra: Vec<Value>) -> ExpandedTask {
        let mut args = Vec::with_capacity(self.fixed_args.len() + extra.len());
        args.extend(self.fixed_args.iter().cloned());
        args.extend(extra);
        ExpandedTask {
            task: Arc::clone(&self.task),
            args,
        }
    }
}

impl fmt::Debug for TaskSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSlot")
            .field("task", &self.task.name())
            .field("fixed_args", &self.fixed_args)
            .field("expansion", &self.expansion)
            .finish()
    }
}

/// One invocation derived from a [`TaskSlot`]
#[derive(Clone)]
pub struct ExpandedTask {
    pub task: Arc<dyn Task>,
    pub args: Vec<Value>,
}

impl fmt::Debug for ExpandedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpandedTask")
            .field("task", &self.task.name())
            .field("args", &self.args)
            .finish()
    }
}

/// Task slots that run concurrently
#[derive(Debug, Clone, Default)]
pub struct Step {
    slots: Vec<TaskSlot>,
}

impl Step {
    pub fn new(slot: TaskSlot) -> Self {
        Self { slots: vec![slot] }
    }

    pub fn push(&mut self, slot: TaskSlot) {
        self.slots.push(slot);
    }

    pub fn slots(&self) -> &[TaskSlot] {
        &self.slots
    }

    pub(crate) fn last_slot_mut(&mut self) -> Option<&mut TaskSlot> {
        self.slots.last_mut()
    }

    /// Expanded tasks of every slot: slot order, then expansion order.
    pub fn expand(&self) -> Vec<ExpandedTask> {
        self.slots.iter().flat_map(TaskSlot::expand).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{task_fn, TaskContext};

    fn noop() -> Arc<dyn Task> {
        Arc::new(task_fn(|ctx: TaskContext, _args| {
            ctx.resolve(Value::Null);
            Ok(())
        }))
    }

    fn args_of(tasks: &[ExpandedTask]) -> Vec<Vec<Value>> {
        tasks.iter().map(|t| t.args.clone()).collect()
    }

    #[test]
    fn plain_slot_expands_once_with_fixed_args() {
        let mut slot = TaskSlot::new(noop());
        slot.bind_args(vec!["argumentTestA".into(), Value::Number(2.0)]);

        let tasks = slot.expand();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].args, vec![Value::from("argumentTestA"), Value::Number(2.0)]);
    }

    #[test]
    fn for_each_keeps_group_order_and_prepends_fixed_args() {
        let mut slot = TaskSlot::new(noop());
        slot.bind_args(vec!["X".into()]);
        slot.for_each(vec!["Y".into(), "Z".into()]);

        assert_eq!(
            args_of(&slot.expand()),
            vec![
                vec![Value::from("X"), Value::from("Y")],
                vec![Value::from("X"), Value::from("Z")],
            ]
        );
    }

    #[test]
    fn for_each_uses_sequences_verbatim() {
        let mut slot = TaskSlot::new(noop());
        slot.for_each(vec![
            ArgGroup::from(vec![Value::from("a"), Value::Number(1.0)]),
            ArgGroup::from("b"),
        ]);

        assert_eq!(
            args_of(&slot.expand()),
            vec![vec![Value::from("a"), Value::Number(1.0)], vec![Value::from("b")]]
        );
    }

    #[test]
    fn expansion_is_repeatable() {
        let mut slot = TaskSlot::new(noop());
        slot.for_each(vec!["a".into(), "b".into(), "c".into()]);

        let first = args_of(&slot.expand());
        let second = args_of(&slot.expand());
        assert_eq!(first, second);
        assert_eq!(slot.expanded_len(), 3);
    }

    #[test]
    fn times_repeats_identical_args() {
        let mut slot = TaskSlot::new(noop());
        slot.bind_args(vec!["same".into()]);
        slot.times(5).unwrap();

        let tasks = slot.expand();
        assert_eq!(tasks.len(), 5);
        assert!(tasks.iter().all(|t| t.args == vec![Value::from("same")]));
    }

    #[test]
    fn times_rejects_zero() {
        let mut slot = TaskSlot::new(noop());
        assert!(matches!(slot.times(0), Err(FlowError::InvalidArgument(_))));
        assert_eq!(slot.expanded_len(), 1);
    }

    #[test]
    fn last_directive_wins() {
        let mut slot = TaskSlot::new(noop());
        slot.times(4).unwrap();
        slot.for_each(vec!["only".into()]);
        assert_eq!(slot.expanded_len(), 1);

        slot.times(2).unwrap();
        assert_eq!(args_of(&slot.expand()), vec![Vec::<Value>::new(), Vec::new()]);
    }

    #[test]
    fn empty_for_each_expands_to_nothing() {
        let mut slot = TaskSlot::new(noop());
        slot.for_each(Vec::new());
        assert!(slot.expand().is_empty());
    }

    #[test]
    fn step_expands_slots_in_order() {
        let mut first = TaskSlot::new(noop());
        first.times(2).unwrap();
        first.bind_args(vec!["first".into()]);
        let mut second = TaskSlot::new(noop());
        second.bind_args(vec!["second".into()]);

        let mut step = Step::new(first);
        step.push(second);

        assert_eq!(
            args_of(&step.expand()),
            vec![
                vec![Value::from("first")],
                vec![Value::from("first")],
                vec![Value::from("second")],
            ]
        );
    }
}

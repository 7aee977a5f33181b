use crate::executor::{panic_message, StepCollector};
use async_trait::async_trait;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use taskflow_core::{StepResult, TaskError, TaskResult, Value};
use tokio::runtime::Handle;

/// A unit of work that reports its outcome through a [`Completion`]
///
/// `call` may complete the task before returning or hand the completion to
/// another thread or tokio task and complete it later. Returning `Err` (or
/// panicking) counts as rejecting with that error. Once the task has
/// completed, an `Err` is ignored and a panic propagates to the caller.
pub trait Task: Send + Sync {
    fn call(&self, ctx: TaskContext, args: Vec<Value>) -> Result<(), TaskError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T: Task + ?Sized> Task for Arc<T> {
    fn call(&self, ctx: TaskContext, args: Vec<Value>) -> Result<(), TaskError> {
        (**self).call(ctx, args)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// What a task receives besides its own arguments
pub struct TaskContext {
    pub completion: Completion,
    /// Result of the previous step, `None` for the first step.
    pub previous: Option<Arc<StepResult>>,
}

impl TaskContext {
    pub fn previous_errors(&self) -> &[Option<TaskError>] {
        match &self.previous {
            Some(previous) => previous.errors.as_slice(),
            None => &[],
        }
    }

    pub fn previous_data(&self) -> &[Value] {
        match &self.previous {
            Some(previous) => previous.data.as_slice(),
            None => &[],
        }
    }

    pub fn done(self, error: Option<TaskError>, data: impl Into<Value>) {
        self.completion.done(error, data);
    }

    pub fn resolve(self, data: impl Into<Value>) {
        self.completion.resolve(data);
    }

    pub fn reject(self, error: impl Into<TaskError>) {
        self.completion.reject(error);
    }
}

/// Completion handle of one expanded task
///
/// Every method consumes the handle, so a task reports at most once through
/// it. Dropping it without reporting leaves the task outstanding.
pub struct Completion {
    index: usize,
    collector: Arc<StepCollector>,
}

impl Completion {
    pub(crate) fn new(index: usize, collector: Arc<StepCollector>) -> Self {
        Self { index, collector }
    }

    /// Position of the task within its step.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn done(self, error: Option<TaskError>, data: impl Into<Value>) {
        self.collector.complete(self.index, TaskResult { error, data: data.into() });
    }

    pub fn resolve(self, data: impl Into<Value>) {
        self.done(None, data);
    }

    pub fn reject(self, error: impl Into<TaskError>) {
        self.done(Some(error.into()), Value::Null);
    }

    pub fn complete(self, result: Result<Value, TaskError>) {
        match result {
            Ok(data) => self.resolve(data),
            Err(error) => self.reject(error),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Task backed by a closure
pub struct FnTask<F> {
    name: String,
    func: F,
}

impl<F> Task for FnTask<F>
where
    F: Fn(TaskContext, Vec<Value>) -> Result<(), TaskError> + Send + Sync,
{
    fn call(&self, ctx: TaskContext, args: Vec<Value>) -> Result<(), TaskError> {
        (self.func)(ctx, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a callback-style closure as a [`Task`].
pub fn task_fn<F>(func: F) -> FnTask<F>
where
    F: Fn(TaskContext, Vec<Value>) -> Result<(), TaskError> + Send + Sync,
{
    FnTask {
        name: "fn".to_string(),
        func,
    }
}

impl<F> FnTask<F> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Task written as an async function returning its data
#[async_trait]
pub trait AsyncTask: Send + Sync + 'static {
    async fn execute(
        &self,
        previous: Option<Arc<StepResult>>,
        args: Vec<Value>,
    ) -> Result<Value, TaskError>;
}

/// Runs an [`AsyncTask`] on the current tokio runtime
pub struct Spawned<T> {
    inner: Arc<T>,
}

pub fn spawned<T: AsyncTask>(task: T) -> Spawned<T> {
    Spawned {
        inner: Arc::new(task),
    }
}

impl<T: AsyncTask> Task for Spawned<T> {
    fn call(&self, ctx: TaskContext, args: Vec<Value>) -> Result<(), TaskError> {
        let handle = Handle::try_current().map_err(|e| TaskError::Runtime(e.to_string()))?;
        let task = Arc::clone(&self.inner);
        let TaskContext {
            completion,
            previous,
        } = ctx;

        handle.spawn(async move {
            let work = AssertUnwindSafe(task.execute(previous, args)).catch_unwind();
            let result = match work.await {
                Ok(result) => result,
                Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
            };
            completion.complete(result);
        });
        Ok(())
    }

    fn name(&self) -> &str {
        std::any::type_name::<T>()
    }
}

/// Async closure adapter, see [`async_fn`]
pub struct AsyncFnTask<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> AsyncTask for AsyncFnTask<F>
where
    F: Fn(Option<Arc<StepResult>>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    async fn execute(
        &self,
        previous: Option<Arc<StepResult>>,
        args: Vec<Value>,
    ) -> Result<Value, TaskError> {
        (self.func)(previous, args).await
    }
}

/// Wrap an async closure as a spawned [`Task`].
pub fn async_fn<F, Fut>(func: F) -> Spawned<AsyncFnTask<F>>
where
    F: Fn(Option<Arc<StepResult>>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    spawned(AsyncFnTask { func })
}
